// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stage bodies of the resource graph builder.
//!
//! Each stage reads its inputs from [`StageOutputs`], declares its nodes and
//! hands identities and deferred values forward. Logical resource names are
//! fixed; only the VPC and gateway names come from configuration.

use serde_json::json;
use tracing::{debug, warn};

use super::stage::{Stage, StageOutputs, Upstream};
use super::{AttributeValue, Realization, ResourceGraph, ResourceNode};
use crate::bootstrap::{compose_boot_artifact, encode_user_data, DATABASE_NAME, SERVICE_ACCOUNT};
use crate::config::StackConfig;
use crate::domain::{NetworkTopology, ResourceId, ResourceKind, SubnetSpec, SubnetTier};
use crate::errors::StackResult;
use crate::frp::Deferred;
use crate::scaling::{DirectionalPolicy, ScalingPolicy, ScalingPolicyEngine, GROUP_DIMENSION};
use crate::security::{
    Direction, Peer, Rule, SecurityPolicy, SecurityPolicyComposer, SecurityTier, APP_PORT,
};

pub(crate) const VPC: &str = "vpc";
pub(crate) const INTERNET_GATEWAY: &str = "internetGateway";
pub(crate) const IGW_ATTACHMENT: &str = "csye6225-igw-attachment";
pub(crate) const PUBLIC_ROUTE: &str = "public-route";
pub(crate) const DB_PARAMETER_GROUP: &str = "csye6225-rds-param-group";
pub(crate) const DB_SUBNET_GROUP: &str = "rds-subnet-group";
pub(crate) const DB_INSTANCE: &str = "csye6225";
pub(crate) const TOPIC: &str = "Assignments-Submission-Notification-Topic";
pub(crate) const TABLE: &str = "emailStatusTable";
pub(crate) const GCP_ACCOUNT: &str = "myAccount";
pub(crate) const BUCKET: &str = "csye6225-bucket";
pub(crate) const BUCKET_MEMBER: &str = "bucketObjectAdmin";
pub(crate) const GCP_KEY: &str = "csye6225-key";
pub(crate) const FUNCTION_ROLE: &str = "lambdaRole";
pub(crate) const FUNCTION: &str = "assignmentsSubmissionLambdaFunction";
pub(crate) const SUBSCRIPTION: &str = "myTopicSubscription";
pub(crate) const FUNCTION_PERMISSION: &str = "myLambdaPermission";
pub(crate) const INSTANCE_ROLE: &str = "CloudWatchAndSNS";
pub(crate) const PUBLISH_POLICY: &str = "SNSPolicyAttachment";
pub(crate) const INSTANCE_PROFILE: &str = "instanceProfile";
pub(crate) const LAUNCH_TEMPLATE: &str = "serverLaunchTemplate";
pub(crate) const TARGET_GROUP: &str = "appTargetGroup";
pub(crate) const LOAD_BALANCER: &str = "appLoadBalancer";
pub(crate) const HTTP_LISTENER: &str = "appListener";
pub(crate) const HTTPS_LISTENER: &str = "httpsListener";
pub(crate) const AUTO_SCALING_GROUP: &str = "appAutoScalingGroup";
pub(crate) const DNS_RECORD: &str = "csye6225-webServerRecord";

pub(crate) const HEALTH_CHECK_PATH: &str = "/healthz";
pub(crate) const TLS_POLICY: &str = "ELBSecurityPolicy-2016-08";

const DB_ENDPOINT: &str = "endpoint";
const TOPIC_ARN: &str = "arn";
const LB_DNS_NAME: &str = "dns_name";
const LB_ZONE_ID: &str = "zone_id";

fn id(name: &str) -> ResourceId {
    ResourceId::fixed(name)
}

fn assume_role_policy(service: &str) -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Effect": "Allow",
            "Principal": { "Service": service }
        }]
    })
    .to_string()
}

fn attachment(role: &ResourceId, policy_arn: impl Into<AttributeValue>) -> [(&'static str, AttributeValue); 2] {
    [("role", role.output("name").into()), ("policyArn", policy_arn.into())]
}

fn tags<'t>(entries: impl IntoIterator<Item = (&'t str, &'t str)>) -> AttributeValue {
    AttributeValue::map(entries.into_iter().map(|(k, v)| (k.to_string(), v.to_string())))
}

/// Mutable state threaded through the stages of one run
pub(crate) struct StageContext<'a> {
    pub(crate) config: &'a StackConfig,
    pub(crate) zones: &'a [String],
    pub(crate) graph: ResourceGraph,
    pub(crate) outputs: StageOutputs,
    pub(crate) realization: Realization,
    pub(crate) composer: SecurityPolicyComposer,
    pub(crate) topology: Option<NetworkTopology>,
    pub(crate) policies: Vec<SecurityPolicy>,
    pub(crate) boot_artifact: Option<Deferred<String>>,
    pub(crate) user_data: Option<Deferred<String>>,
    pub(crate) scaling: Option<ScalingPolicy>,
}

impl<'a> StageContext<'a> {
    pub(crate) fn new(config: &'a StackConfig, zones: &'a [String], outputs: StageOutputs) -> Self {
        Self {
            config,
            zones,
            graph: ResourceGraph::new(),
            outputs,
            realization: Realization::new(),
            composer: SecurityPolicyComposer::new(),
            topology: None,
            policies: Vec::new(),
            boot_artifact: None,
            user_data: None,
            scaling: None,
        }
    }

    pub(crate) fn run(&mut self, stage: Stage) -> StackResult<()> {
        match stage {
            Stage::Network => self.network(),
            Stage::SecurityPolicy => self.security_policy(),
            Stage::Database => self.database(),
            Stage::AuxiliaryServices => self.auxiliary_services(),
            Stage::BootArtifact => self.compose_boot(),
            Stage::LaunchTemplate => self.launch_template(),
            Stage::LoadBalancer => self.load_balancer(),
            Stage::AutoScaling => self.auto_scaling(),
            Stage::Dns => self.dns(),
        }
    }

    fn declare<const N: usize>(
        &mut self,
        stage: Stage,
        name: &str,
        kind: ResourceKind,
        attrs: [(&'static str, AttributeValue); N],
    ) -> StackResult<ResourceId> {
        let node = attrs
            .into_iter()
            .fold(ResourceNode::builder(id(name), kind), |node, (k, v)| node.attr(k, v));
        self.graph.declare(stage, node)
    }

    fn slot(&mut self, resource: &ResourceId, output: &str) -> StackResult<Deferred<String>> {
        Ok(self.realization.slot(resource.output(output))?)
    }

    fn network(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::Network;
        let config = self.config;
        let topology = NetworkTopology::plan(config.address_block, self.zones)?;
        debug!(
            block = %topology.address_block,
            az_count = topology.az_count,
            "address block partitioned"
        );

        // Configured names are display names only; logical ids are fixed
        let vpc = self.declare(
            STAGE,
            VPC,
            ResourceKind::Vpc,
            [
                ("cidrBlock", topology.address_block.to_string().into()),
                ("tags", tags([("Name", config.vpc_name.as_str())])),
            ],
        )?;
        let igw = self.declare(
            STAGE,
            INTERNET_GATEWAY,
            ResourceKind::InternetGateway,
            [("tags", tags([("Name", config.igw_name.as_str())]))],
        )?;
        let attachment = self.declare(
            STAGE,
            IGW_ATTACHMENT,
            ResourceKind::InternetGatewayAttachment,
            [
                ("vpcId", vpc.output("id").into()),
                ("internetGatewayId", igw.output("id").into()),
            ],
        )?;

        for tier in [SubnetTier::Public, SubnetTier::Private] {
            let name = tier.route_table();
            self.declare(
                STAGE,
                name,
                ResourceKind::RouteTable,
                [("vpcId", vpc.output("id").into()), ("tags", tags([("Name", name)]))],
            )?;
        }

        // The gateway only routes once it is attached to the VPC
        let public_table = id(SubnetTier::Public.route_table());
        self.graph.declare(
            STAGE,
            ResourceNode::builder(id(PUBLIC_ROUTE), ResourceKind::Route)
                .attr("routeTableId", public_table.output("id"))
                .attr("destinationCidrBlock", config.public_route_destination.to_string())
                .attr("gatewayId", igw.output("id"))
                .after(&attachment),
        )?;

        let public = self.declare_subnets(&vpc, topology.subnets(SubnetTier::Public))?;
        let private = self.declare_subnets(&vpc, topology.subnets(SubnetTier::Private))?;

        self.outputs.provide_resource(Upstream::Vpc, vpc);
        self.outputs.provide_resources(Upstream::PublicSubnets, public);
        self.outputs.provide_resources(Upstream::PrivateSubnets, private);
        self.topology = Some(topology);
        Ok(())
    }

    fn declare_subnets(&mut self, vpc: &ResourceId, specs: &[SubnetSpec]) -> StackResult<Vec<ResourceId>> {
        let mut ids = Vec::with_capacity(specs.len());
        for spec in specs {
            let mut node = ResourceNode::builder(id(&spec.resource_name()), ResourceKind::Subnet)
                .attr("vpcId", vpc.output("id"))
                .attr("cidrBlock", spec.cidr.to_string())
                .attr("availabilityZone", spec.zone.as_str())
                .attr("tags", tags([("Name", spec.name_tag().as_str())]));
            if spec.tier == SubnetTier::Public {
                node = node.attr("mapPublicIpOnLaunch", true);
            }
            let subnet = self.graph.declare(Stage::Network, node)?;

            self.declare(
                Stage::Network,
                &spec.association_name(),
                ResourceKind::RouteTableAssociation,
                [
                    ("subnetId", subnet.output("id").into()),
                    ("routeTableId", id(&spec.route_table).output("id").into()),
                ],
            )?;
            ids.push(subnet);
        }
        Ok(ids)
    }

    fn security_policy(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::SecurityPolicy;
        let vpc = self.outputs.resource(STAGE, Upstream::Vpc)?.clone();

        // Groups first: every rule below references groups that already exist.
        for tier in SecurityTier::ALL {
            let group = self.declare(
                STAGE,
                tier.group_name(),
                ResourceKind::SecurityGroup,
                [
                    ("description", tier.description().into()),
                    ("vpcId", vpc.output("id").into()),
                ],
            )?;
            self.composer.register(tier, group);
        }

        let policies = self.composer.compose_all()?;
        for policy in &policies {
            for rule in policy.rules() {
                self.declare_rule(policy, rule)?;
            }
        }

        for (tier, upstream) in [
            (SecurityTier::LoadBalancer, Upstream::LoadBalancerPolicy),
            (SecurityTier::Compute, Upstream::ComputePolicy),
            (SecurityTier::Database, Upstream::DatabasePolicy),
        ] {
            if let Some(identity) = self.composer.identity(tier) {
                self.outputs.provide_resource(upstream, identity.group.clone());
            }
        }
        self.policies = policies;
        Ok(())
    }

    fn declare_rule(&mut self, policy: &SecurityPolicy, rule: &Rule) -> StackResult<()> {
        let mut node = ResourceNode::builder(id(&rule.name), ResourceKind::SecurityGroupRule)
            .attr("type", rule.direction.as_str())
            .attr("fromPort", rule.ports.from)
            .attr("toPort", rule.ports.to)
            .attr("protocol", rule.protocol.as_str())
            .attr("securityGroupId", policy.owner.group.output("id"))
            .attr_opt("description", rule.description.as_deref());

        node = match &rule.peer {
            Peer::Tier(peer) => node.attr("sourceSecurityGroupId", peer.group.output("id")),
            Peer::Cidrs(_) => {
                let v4: Vec<String> = rule.peer.ipv4().iter().map(ToString::to_string).collect();
                let v6: Vec<String> = rule.peer.ipv6().iter().map(ToString::to_string).collect();
                node.attr_opt("cidrBlocks", (!v4.is_empty()).then(|| AttributeValue::list(v4)))
                    .attr_opt("ipv6CidrBlocks", (!v6.is_empty()).then(|| AttributeValue::list(v6)))
            }
        };

        if rule.direction == Direction::Ingress && rule.peer.is_open() {
            debug!(rule = %rule.name, ports = %rule.ports, "open ingress rule");
        }
        self.graph.declare(Stage::SecurityPolicy, node)?;
        Ok(())
    }

    fn database(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::Database;
        let db_group = self.outputs.resource(STAGE, Upstream::DatabasePolicy)?.clone();
        let private: Vec<ResourceId> = self.outputs.resources(STAGE, Upstream::PrivateSubnets)?.to_vec();
        let credential = self.outputs.value(STAGE, Upstream::DatabaseCredential, "password")?;

        let parameter_group = self.declare(
            STAGE,
            DB_PARAMETER_GROUP,
            ResourceKind::DbParameterGroup,
            [
                ("family", "mysql8.0".into()),
                ("description", "Custom parameter group for csye6225 MySQL RDS".into()),
                (
                    "parameters",
                    AttributeValue::list([
                        AttributeValue::map([("name", "character_set_server"), ("value", "utf8mb4")]),
                        AttributeValue::map([("name", "collation_server"), ("value", "utf8mb4_unicode_ci")]),
                    ]),
                ),
            ],
        )?;
        let subnet_group = self.declare(
            STAGE,
            DB_SUBNET_GROUP,
            ResourceKind::DbSubnetGroup,
            [("subnetIds", AttributeValue::list(private.iter().map(|s| s.output("id"))))],
        )?;

        let instance = self.declare(
            STAGE,
            DB_INSTANCE,
            ResourceKind::DbInstance,
            [
                ("engine", "mysql".into()),
                ("instanceClass", "db.t3.micro".into()),
                ("multiAz", false.into()),
                ("identifier", DB_INSTANCE.into()),
                ("username", SERVICE_ACCOUNT.into()),
                ("password", credential.into()),
                ("dbSubnetGroupName", subnet_group.output("name").into()),
                ("vpcSecurityGroupIds", AttributeValue::list([db_group.output("id")])),
                ("publiclyAccessible", false.into()),
                ("skipFinalSnapshot", true.into()),
                ("deletionProtection", false.into()),
                ("allocatedStorage", 20u32.into()),
                ("dbName", DATABASE_NAME.into()),
                ("parameterGroupName", parameter_group.output("name").into()),
            ],
        )?;

        let endpoint = self.slot(&instance, DB_ENDPOINT)?;
        self.outputs.provide_resource(Upstream::DatabaseEndpoint, instance);
        self.outputs.provide_value(Upstream::DatabaseEndpoint, DB_ENDPOINT, endpoint);
        Ok(())
    }

    fn auxiliary_services(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::AuxiliaryServices;
        let config = self.config;

        let topic = self.declare(STAGE, TOPIC, ResourceKind::NotificationTopic, [])?;
        let topic_arn = self.slot(&topic, TOPIC_ARN)?;

        let table = self.declare(
            STAGE,
            TABLE,
            ResourceKind::KeyValueTable,
            [
                (
                    "attributes",
                    AttributeValue::list([
                        AttributeValue::map([("name", "sentId"), ("type", "S")]),
                        AttributeValue::map([("name", "toEmailAddress"), ("type", "S")]),
                    ]),
                ),
                ("billingMode", "PAY_PER_REQUEST".into()),
                ("hashKey", "sentId".into()),
                ("rangeKey", "toEmailAddress".into()),
            ],
        )?;

        let account = self.declare(
            STAGE,
            GCP_ACCOUNT,
            ResourceKind::ServiceAccount,
            [
                ("accountId", "my-account-id".into()),
                ("displayName", "My Service Account".into()),
            ],
        )?;
        let bucket = self.declare(STAGE, BUCKET, ResourceKind::StorageBucket, [])?;
        let member = self
            .slot(&account, "email")?
            .map(|email| format!("serviceAccount:{email}"))
            .relabel(format!("{BUCKET_MEMBER}.member"));
        self.declare(
            STAGE,
            BUCKET_MEMBER,
            ResourceKind::BucketIamMember,
            [
                ("bucket", bucket.output("name").into()),
                ("role", "roles/storage.objectAdmin".into()),
                ("member", member.into()),
            ],
        )?;
        let key = self.declare(
            STAGE,
            GCP_KEY,
            ResourceKind::ServiceAccountKey,
            [("serviceAccountId", account.output("name").into())],
        )?;

        let role = self.declare(
            STAGE,
            FUNCTION_ROLE,
            ResourceKind::IamRole,
            [("assumeRolePolicy", assume_role_policy("lambda.amazonaws.com").into())],
        )?;
        self.declare(
            STAGE,
            "lambdaDynamoDBPolicyAttachment",
            ResourceKind::IamRolePolicyAttachment,
            attachment(&role, "arn:aws:iam::aws:policy/AmazonDynamoDBFullAccess"),
        )?;
        self.declare(
            STAGE,
            "lambdaLoggingPolicyAttachment",
            ResourceKind::IamRolePolicyAttachment,
            attachment(&role, "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"),
        )?;

        if config.serverless_zip.is_none() {
            warn!("serverless:zip not set, event consumer declared without code archive");
        }
        let function = self.graph.declare(
            STAGE,
            ResourceNode::builder(id(FUNCTION), ResourceKind::Function)
                .attr("handler", "main")
                .attr("runtime", "go1.x")
                .attr("role", role.output("arn"))
                .attr_opt("code", config.serverless_zip.as_deref())
                .attr(
                    "environment",
                    AttributeValue::map([(
                        "variables",
                        AttributeValue::map([
                            ("GOOGLE_CREDENTIALS", AttributeValue::from(key.output("privateKey"))),
                            ("BUCKET_NAME", bucket.output("name").into()),
                            ("MAILGUN_API", config.mailgun_api_key_value().into()),
                            ("EMAIL_DOMAIN", config.domain_name.as_str().into()),
                            ("DYNAMO_TABLE", table.output("name").into()),
                        ]),
                    )]),
                ),
        )?;

        self.declare(
            STAGE,
            SUBSCRIPTION,
            ResourceKind::TopicSubscription,
            [
                ("topic", topic.output("arn").into()),
                ("protocol", "lambda".into()),
                ("endpoint", function.output("arn").into()),
            ],
        )?;
        self.declare(
            STAGE,
            FUNCTION_PERMISSION,
            ResourceKind::FunctionPermission,
            [
                ("action", "lambda:InvokeFunction".into()),
                ("function", function.output("arn").into()),
                ("principal", "sns.amazonaws.com".into()),
                ("sourceArn", topic.output("arn").into()),
                ("sourceAccount", config.account_id.as_str().into()),
            ],
        )?;

        self.outputs.provide_resource(Upstream::NotificationTopic, topic);
        self.outputs.provide_value(Upstream::NotificationTopic, TOPIC_ARN, topic_arn);
        self.outputs.provide_resource(Upstream::KeyValueTable, table);
        Ok(())
    }

    fn compose_boot(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::BootArtifact;
        let password = self.outputs.value(STAGE, Upstream::DatabaseCredential, "password")?;
        let endpoint = self.outputs.value(STAGE, Upstream::DatabaseEndpoint, DB_ENDPOINT)?;
        let topic_arn = self.outputs.value(STAGE, Upstream::NotificationTopic, TOPIC_ARN)?;

        let script = compose_boot_artifact(password, endpoint, topic_arn, self.config.region.clone());
        let user_data = encode_user_data(script.clone());
        debug!(sources = ?script.sources(), "boot artifact composed");

        self.outputs.provide_value(Upstream::BootArtifact, "script", script.clone());
        self.outputs.provide_value(Upstream::BootArtifact, "userData", user_data.clone());
        self.boot_artifact = Some(script);
        self.user_data = Some(user_data);
        Ok(())
    }

    fn launch_template(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::LaunchTemplate;
        let compute_group = self.outputs.resource(STAGE, Upstream::ComputePolicy)?.clone();
        let user_data = self.outputs.value(STAGE, Upstream::BootArtifact, "userData")?;
        let config = self.config;

        let role = self.declare(
            STAGE,
            INSTANCE_ROLE,
            ResourceKind::IamRole,
            [("assumeRolePolicy", assume_role_policy("ec2.amazonaws.com").into())],
        )?;
        self.declare(
            STAGE,
            "CloudWatchPolicyAttachment",
            ResourceKind::IamRolePolicyAttachment,
            attachment(&role, "arn:aws:iam::aws:policy/CloudWatchAgentServerPolicy"),
        )?;
        let publish = json!({
            "Version": "2012-10-17",
            "Statement": [{ "Effect": "Allow", "Action": "sns:Publish", "Resource": "*" }]
        });
        let publish_policy = self.declare(
            STAGE,
            PUBLISH_POLICY,
            ResourceKind::IamPolicy,
            [("policy", publish.to_string().into())],
        )?;
        self.declare(
            STAGE,
            "snsRolePolicyAttachment",
            ResourceKind::IamRolePolicyAttachment,
            attachment(&role, publish_policy.output("arn")),
        )?;
        let profile = self.declare(
            STAGE,
            INSTANCE_PROFILE,
            ResourceKind::IamInstanceProfile,
            [("role", role.output("name").into())],
        )?;

        let template = self.declare(
            STAGE,
            LAUNCH_TEMPLATE,
            ResourceKind::LaunchTemplate,
            [
                ("name", "EC2-launch-template".into()),
                ("imageId", config.ami_id.as_str().into()),
                ("instanceType", "t2.micro".into()),
                ("keyName", config.key_pair.as_str().into()),
                (
                    "iamInstanceProfile",
                    AttributeValue::map([("name", profile.output("name"))]),
                ),
                (
                    "networkInterfaces",
                    AttributeValue::list([AttributeValue::map([
                        ("associatePublicIpAddress", AttributeValue::from("true")),
                        (
                            "securityGroups",
                            AttributeValue::list([compute_group.output("id")]),
                        ),
                    ])]),
                ),
                ("userData", user_data.into()),
            ],
        )?;

        self.outputs.provide_resource(Upstream::LaunchTemplate, template);
        Ok(())
    }

    fn load_balancer(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::LoadBalancer;
        let vpc = self.outputs.resource(STAGE, Upstream::Vpc)?.clone();
        let public: Vec<ResourceId> = self.outputs.resources(STAGE, Upstream::PublicSubnets)?.to_vec();
        let lb_group = self.outputs.resource(STAGE, Upstream::LoadBalancerPolicy)?.clone();

        let target_group = self.declare(
            STAGE,
            TARGET_GROUP,
            ResourceKind::TargetGroup,
            [
                ("port", APP_PORT.into()),
                ("protocol", "HTTP".into()),
                ("vpcId", vpc.output("id").into()),
                (
                    "healthCheck",
                    AttributeValue::map([
                        ("protocol", "HTTP".to_string()),
                        ("path", HEALTH_CHECK_PATH.to_string()),
                        ("port", APP_PORT.to_string()),
                    ]),
                ),
                ("targetType", "instance".into()),
            ],
        )?;

        let lb = self.declare(
            STAGE,
            LOAD_BALANCER,
            ResourceKind::LoadBalancer,
            [
                ("internal", false.into()),
                ("securityGroups", AttributeValue::list([lb_group.output("id")])),
                ("subnets", AttributeValue::list(public.iter().map(|s| s.output("id")))),
                ("loadBalancerType", "application".into()),
            ],
        )?;
        let dns_name = self.slot(&lb, LB_DNS_NAME)?;
        let zone_id = self.slot(&lb, LB_ZONE_ID)?;
        let certificate = self.config.certificate_arn_value();

        let forward = || {
            AttributeValue::list([AttributeValue::map([
                ("type", AttributeValue::from("forward")),
                ("targetGroupArn", target_group.output("arn").into()),
            ])])
        };
        self.declare(
            STAGE,
            HTTP_LISTENER,
            ResourceKind::Listener,
            [
                ("loadBalancerArn", lb.output("arn").into()),
                ("port", 80u16.into()),
                ("defaultActions", forward()),
            ],
        )?;
        self.declare(
            STAGE,
            HTTPS_LISTENER,
            ResourceKind::Listener,
            [
                ("loadBalancerArn", lb.output("arn").into()),
                ("port", 443u16.into()),
                ("protocol", "HTTPS".into()),
                ("sslPolicy", TLS_POLICY.into()),
                ("certificateArn", certificate.into()),
                ("defaultActions", forward()),
            ],
        )?;

        self.outputs.provide_resource(Upstream::TargetGroup, target_group);
        self.outputs.provide_resource(Upstream::LoadBalancerEndpoint, lb);
        self.outputs.provide_value(Upstream::LoadBalancerEndpoint, LB_DNS_NAME, dns_name);
        self.outputs.provide_value(Upstream::LoadBalancerEndpoint, LB_ZONE_ID, zone_id);
        Ok(())
    }

    fn auto_scaling(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::AutoScaling;
        let template = self.outputs.resource(STAGE, Upstream::LaunchTemplate)?.clone();
        let target_group = self.outputs.resource(STAGE, Upstream::TargetGroup)?.clone();
        let public: Vec<ResourceId> = self.outputs.resources(STAGE, Upstream::PublicSubnets)?.to_vec();
        let config = self.config;
        let profile = config.profile.as_str();

        let tag = |key: &str, value: &str| {
            AttributeValue::map([
                ("key", AttributeValue::from(key)),
                ("value", value.into()),
                ("propagateAtLaunch", true.into()),
            ])
        };

        let group = self.declare(
            STAGE,
            AUTO_SCALING_GROUP,
            ResourceKind::AutoScalingGroup,
            [
                ("name", "csye6225-asg".into()),
                ("defaultCooldown", 60u32.into()),
                (
                    "launchTemplate",
                    AttributeValue::map([
                        ("id", AttributeValue::from(template.output("id"))),
                        ("version", "$Latest".into()),
                    ]),
                ),
                ("minSize", 1u32.into()),
                ("maxSize", 3u32.into()),
                ("desiredCapacity", 1u32.into()),
                ("vpcZoneIdentifiers", AttributeValue::list(public.iter().map(|s| s.output("id")))),
                ("targetGroupArns", AttributeValue::list([target_group.output("arn")])),
                (
                    "tags",
                    AttributeValue::list([
                        tag("Name", "csye6225-webserver-ec2-instance"),
                        tag("Environment", profile),
                    ]),
                ),
            ],
        )?;

        let scaling = ScalingPolicyEngine.policies_for(&group);
        for direction in scaling.directions() {
            self.declare_scaling_direction(&group, direction)?;
        }

        self.outputs.provide_resource(Upstream::AutoScalingGroup, group);
        self.scaling = Some(scaling);
        Ok(())
    }

    fn declare_scaling_direction(&mut self, group: &ResourceId, direction: &DirectionalPolicy) -> StackResult<()> {
        const STAGE: Stage = Stage::AutoScaling;
        let policy = self.declare(
            STAGE,
            direction.name,
            ResourceKind::ScalingPolicy,
            [
                ("adjustmentType", direction.adjustment_type.into()),
                ("scalingAdjustment", direction.adjustment.into()),
                ("cooldown", direction.cooldown_secs.into()),
                ("autoscalingGroupName", group.output("name").into()),
                ("metricAggregationType", direction.aggregation.into()),
                ("policyType", direction.policy_type.into()),
            ],
        )?;

        let alarm = &direction.alarm;
        self.declare(
            STAGE,
            alarm.name,
            ResourceKind::MetricAlarm,
            [
                ("alarmDescription", alarm.description.into()),
                ("comparisonOperator", alarm.comparison.as_str().into()),
                ("evaluationPeriods", alarm.evaluation_periods.into()),
                ("metricName", alarm.metric.into()),
                ("namespace", alarm.namespace.into()),
                ("period", alarm.period_secs.into()),
                ("statistic", alarm.statistic.into()),
                ("threshold", alarm.threshold.into()),
                ("alarmActions", AttributeValue::list([policy.output("arn")])),
                (
                    "dimensions",
                    AttributeValue::map([(GROUP_DIMENSION, group.output("name"))]),
                ),
            ],
        )?;
        Ok(())
    }

    fn dns(&mut self) -> StackResult<()> {
        const STAGE: Stage = Stage::Dns;
        let dns_name = self.outputs.value(STAGE, Upstream::LoadBalancerEndpoint, LB_DNS_NAME)?;
        let zone_id = self.outputs.value(STAGE, Upstream::LoadBalancerEndpoint, LB_ZONE_ID)?;
        let config = self.config;

        let record = self.declare(
            STAGE,
            DNS_RECORD,
            ResourceKind::DnsRecord,
            [
                ("zoneId", config.hosted_zone_id.as_str().into()),
                ("name", config.domain_name.as_str().into()),
                ("type", "A".into()),
                (
                    "aliases",
                    AttributeValue::list([AttributeValue::map([
                        ("name", AttributeValue::from(dns_name)),
                        ("zoneId", zone_id.into()),
                        ("evaluateTargetHealth", true.into()),
                    ])]),
                ),
            ],
        )?;

        debug!(record = %record, domain = %config.domain_name, "dns alias declared");
        self.outputs.provide_resource(Upstream::DnsRecord, record);
        Ok(())
    }
}
