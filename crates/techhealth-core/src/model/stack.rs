//! スタック全体の記述

use super::compute::{
    AmazonLinux2023Kernel, Instance, InstanceClass, InstanceSize, InstanceType, MachineImage,
};
use super::database::{DatabaseEngine, DatabaseInstance, MysqlEngineVersion, RemovalPolicy};
use super::iam::{ManagedPolicy, Role, ServicePrincipal};
use super::network::{Network, SubnetConfiguration, SubnetType};
use super::security::{Peer, Port, SecurityGroup};
use crate::cidr::Ipv4Cidr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

pub const DEFAULT_STACK_NAME: &str = "TechhealthMigrationStack";

/// 1回のデプロイで扱うリソース一式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,

    /// デプロイ先リージョン（未指定なら環境に依存しないテンプレート）
    pub region: Option<String>,

    pub account: Option<String>,

    /// 全リソースに付与するタグ
    pub tags: BTreeMap<String, String>,

    pub network: Network,

    pub security_groups: Vec<SecurityGroup>,

    pub roles: Vec<Role>,

    pub instances: Vec<Instance>,

    pub databases: Vec<DatabaseInstance>,
}

impl Default for Stack {
    fn default() -> Self {
        Self::techhealth_migration()
    }
}

impl Stack {
    /// TechHealth 移行用の固定トポロジー
    ///
    /// - 2ゾーン、ゾーンごとに public /24 と isolated /24
    /// - EC2SG: 0.0.0.0/0 から TCP 22, 80
    /// - RDSSG: EC2SG から TCP 3306 のみ
    /// - EC2Role: ec2.amazonaws.com + AmazonSSMManagedInstanceCore
    /// - MigrationEC2: t3.micro, public
    /// - MigrationRDS: MySQL 8.0, db.t3.micro, 20GiB, isolated, 削除ポリシー DESTROY
    pub fn techhealth_migration() -> Self {
        let vpc_cidr = Ipv4Cidr::from_raw(Ipv4Addr::new(10, 0, 0, 0), 16);
        let network = Network::new("TechHealthVPC", vpc_cidr, 2)
            .with_subnet(SubnetConfiguration::new(
                "PublicSubnet",
                SubnetType::Public,
                24,
            ))
            .with_subnet(SubnetConfiguration::new(
                "PrivateSubnet",
                SubnetType::PrivateIsolated,
                24,
            ));

        let mut ec2_sg = SecurityGroup::new("EC2SG", "Allow SSH and HTTP");
        ec2_sg.add_ingress_rule(Peer::any_ipv4(), Port::tcp(22), "Allow SSH");
        ec2_sg.add_ingress_rule(Peer::any_ipv4(), Port::tcp(80), "Allow HTTP");

        let mut rds_sg = SecurityGroup::new("RDSSG", "Allow MySQL from EC2");
        rds_sg.add_ingress_rule(
            Peer::security_group("EC2SG"),
            Port::tcp(3306),
            "Allow MySQL from EC2",
        );

        let mut role = Role::new("EC2Role", ServicePrincipal::ec2());
        role.add_managed_policy(ManagedPolicy::aws_managed("AmazonSSMManagedInstanceCore"));

        let instance = Instance {
            id: "MigrationEC2".to_string(),
            instance_type: InstanceType::of(InstanceClass::T3, InstanceSize::Micro),
            machine_image: MachineImage::latest_amazon_linux_2023(
                AmazonLinux2023Kernel::Kernel6_1,
            ),
            subnet_type: SubnetType::Public,
            security_group: "EC2SG".to_string(),
            role: Some("EC2Role".to_string()),
            key_name: None,
        };

        let database = DatabaseInstance {
            id: "MigrationRDS".to_string(),
            engine: DatabaseEngine::mysql(MysqlEngineVersion::V8_0),
            instance_type: InstanceType::of(InstanceClass::T3, InstanceSize::Micro),
            allocated_storage: 20,
            subnet_type: SubnetType::PrivateIsolated,
            security_groups: vec!["RDSSG".to_string()],
            removal_policy: RemovalPolicy::Destroy,
            master_username: "admin".to_string(),
        };

        Self {
            name: DEFAULT_STACK_NAME.to_string(),
            region: None,
            account: None,
            tags: BTreeMap::new(),
            network,
            security_groups: vec![ec2_sg, rds_sg],
            roles: vec![role],
            instances: vec![instance],
            databases: vec![database],
        }
    }

    pub fn security_group(&self, id: &str) -> Option<&SecurityGroup> {
        self.security_groups.iter().find(|sg| sg.id == id)
    }

    pub fn security_group_mut(&mut self, id: &str) -> Option<&mut SecurityGroup> {
        self.security_groups.iter_mut().find(|sg| sg.id == id)
    }

    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn instance_mut(&mut self, id: &str) -> Option<&mut Instance> {
        self.instances.iter_mut().find(|i| i.id == id)
    }

    pub fn database_mut(&mut self, id: &str) -> Option<&mut DatabaseInstance> {
        self.databases.iter_mut().find(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_topology_shape() {
        let stack = Stack::techhealth_migration();
        assert_eq!(stack.name, "TechhealthMigrationStack");
        assert_eq!(stack.network.max_azs, 2);
        assert_eq!(stack.network.cidr.to_string(), "10.0.0.0/16");
        assert_eq!(stack.network.subnet_configuration.len(), 2);

        let ec2_sg = stack.security_group("EC2SG").unwrap();
        assert!(ec2_sg.allows_from_anywhere(Port::tcp(22)));
        assert!(ec2_sg.allows_from_anywhere(Port::tcp(80)));

        let rds_sg = stack.security_group("RDSSG").unwrap();
        let rules: Vec<_> = rds_sg.rules_for(Port::tcp(3306)).collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].peer, Peer::security_group("EC2SG"));

        let role = stack.role("EC2Role").unwrap();
        assert_eq!(role.assumed_by.as_str(), "ec2.amazonaws.com");
        assert_eq!(role.managed_policies[0].name, "AmazonSSMManagedInstanceCore");
    }

    #[test]
    fn test_database_is_isolated_and_destroyed() {
        let stack = Stack::techhealth_migration();
        let db = &stack.databases[0];
        assert_eq!(db.subnet_type, SubnetType::PrivateIsolated);
        assert_eq!(db.allocated_storage, 20);
        assert_eq!(db.instance_type.db_class(), "db.t3.micro");
        assert!(db.loses_data_on_teardown());
    }

    #[test]
    fn test_instance_in_public_segment() {
        let stack = Stack::techhealth_migration();
        let instance = &stack.instances[0];
        assert!(instance.subnet_type.is_public());
        assert_eq!(instance.instance_type.to_string(), "t3.micro");
        assert_eq!(instance.role.as_deref(), Some("EC2Role"));
    }
}
