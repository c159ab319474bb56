// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module

mod cidr_partition;
mod graph_order;
