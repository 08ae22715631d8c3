//! データモデル定義
//!
//! スタックを構成するリソースの型定義です。

mod compute;
mod database;
mod iam;
mod network;
mod security;
mod stack;

pub use compute::{
    AmazonLinux2023Kernel, Instance, InstanceClass, InstanceSize, InstanceType, MachineImage,
};
pub use database::{DatabaseEngine, DatabaseInstance, MysqlEngineVersion, RemovalPolicy};
pub use iam::{ManagedPolicy, Role, ServicePrincipal};
pub use network::{Network, Subnet, SubnetConfiguration, SubnetType};
pub use security::{IngressRule, Peer, Port, Protocol, SecurityGroup};
pub use stack::{DEFAULT_STACK_NAME, Stack};
