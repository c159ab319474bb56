// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Kind Taxonomy
//!
//! The closed set of resource kinds this crate declares. Each kind maps to the
//! provider type token the external provisioning engine understands.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a declared resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    // Network
    Vpc,
    InternetGateway,
    InternetGatewayAttachment,
    RouteTable,
    Route,
    Subnet,
    RouteTableAssociation,

    // Security
    SecurityGroup,
    SecurityGroupRule,

    // Identity
    IamRole,
    IamPolicy,
    IamRolePolicyAttachment,
    IamInstanceProfile,

    // Database
    DbParameterGroup,
    DbSubnetGroup,
    DbInstance,

    // Auxiliary services
    ServiceAccount,
    ServiceAccountKey,
    StorageBucket,
    BucketIamMember,
    KeyValueTable,
    NotificationTopic,
    TopicSubscription,
    Function,
    FunctionPermission,

    // Compute and traffic
    LaunchTemplate,
    TargetGroup,
    LoadBalancer,
    Listener,
    AutoScalingGroup,
    ScalingPolicy,
    MetricAlarm,

    // DNS
    DnsRecord,
}

impl ResourceKind {
    /// Provider type token
    pub fn type_token(&self) -> &'static str {
        match self {
            Self::Vpc => "aws:ec2/vpc:Vpc",
            Self::InternetGateway => "aws:ec2/internetGateway:InternetGateway",
            Self::InternetGatewayAttachment => {
                "aws:ec2/internetGatewayAttachment:InternetGatewayAttachment"
            }
            Self::RouteTable => "aws:ec2/routeTable:RouteTable",
            Self::Route => "aws:ec2/route:Route",
            Self::Subnet => "aws:ec2/subnet:Subnet",
            Self::RouteTableAssociation => "aws:ec2/routeTableAssociation:RouteTableAssociation",
            Self::SecurityGroup => "aws:ec2/securityGroup:SecurityGroup",
            Self::SecurityGroupRule => "aws:ec2/securityGroupRule:SecurityGroupRule",
            Self::IamRole => "aws:iam/role:Role",
            Self::IamPolicy => "aws:iam/policy:Policy",
            Self::IamRolePolicyAttachment => "aws:iam/rolePolicyAttachment:RolePolicyAttachment",
            Self::IamInstanceProfile => "aws:iam/instanceProfile:InstanceProfile",
            Self::DbParameterGroup => "aws:rds/parameterGroup:ParameterGroup",
            Self::DbSubnetGroup => "aws:rds/subnetGroup:SubnetGroup",
            Self::DbInstance => "aws:rds/instance:Instance",
            Self::ServiceAccount => "gcp:serviceaccount/account:Account",
            Self::ServiceAccountKey => "gcp:serviceaccount/key:Key",
            Self::StorageBucket => "gcp:storage/bucket:Bucket",
            Self::BucketIamMember => "gcp:storage/bucketIAMMember:BucketIAMMember",
            Self::KeyValueTable => "aws:dynamodb/table:Table",
            Self::NotificationTopic => "aws:sns/topic:Topic",
            Self::TopicSubscription => "aws:sns/topicSubscription:TopicSubscription",
            Self::Function => "aws:lambda/function:Function",
            Self::FunctionPermission => "aws:lambda/permission:Permission",
            Self::LaunchTemplate => "aws:ec2/launchTemplate:LaunchTemplate",
            Self::TargetGroup => "aws:alb/targetGroup:TargetGroup",
            Self::LoadBalancer => "aws:alb/loadBalancer:LoadBalancer",
            Self::Listener => "aws:alb/listener:Listener",
            Self::AutoScalingGroup => "aws:autoscaling/group:Group",
            Self::ScalingPolicy => "aws:autoscaling/policy:Policy",
            Self::MetricAlarm => "aws:cloudwatch/metricAlarm:MetricAlarm",
            Self::DnsRecord => "aws:route53/record:Record",
        }
    }

    /// Whether the kind belongs to the network layer
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Vpc
                | Self::InternetGateway
                | Self::InternetGatewayAttachment
                | Self::RouteTable
                | Self::Route
                | Self::Subnet
                | Self::RouteTableAssociation
        )
    }

    /// Whether the kind carries security policy
    pub fn is_security(&self) -> bool {
        matches!(self, Self::SecurityGroup | Self::SecurityGroupRule)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_token())
    }
}
