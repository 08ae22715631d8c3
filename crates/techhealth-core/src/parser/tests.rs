use super::*;
use crate::model::{Peer, Port, RemovalPolicy, SubnetType};

#[test]
fn test_empty_document_keeps_fixed_topology() {
    let stack = parse_kdl_string("").unwrap();
    assert_eq!(stack, Stack::techhealth_migration());
}

#[test]
fn test_parse_stack_name_and_region() {
    let kdl = r#"
        stack "TechhealthStaging" {
            region "ap-northeast-1"
            account "123456789012"
            tags {
                Project "techhealth"
                Owner "platform"
            }
        }
    "#;

    let stack = parse_kdl_string(kdl).unwrap();
    assert_eq!(stack.name, "TechhealthStaging");
    assert_eq!(stack.region.as_deref(), Some("ap-northeast-1"));
    assert_eq!(stack.account.as_deref(), Some("123456789012"));
    assert_eq!(stack.tags.get("Project").map(String::as_str), Some("techhealth"));
    assert_eq!(stack.tags.len(), 2);
}

#[test]
fn test_parse_network_overrides() {
    let kdl = r#"
        stack "S" {
            network {
                cidr "172.16.0.0/16"
                max-azs 3
            }
        }
    "#;

    let stack = parse_kdl_string(kdl).unwrap();
    assert_eq!(stack.network.cidr.to_string(), "172.16.0.0/16");
    assert_eq!(stack.network.max_azs, 3);
    // サブネット構成は既定のまま
    assert_eq!(stack.network.subnet_configuration.len(), 2);
}

#[test]
fn test_parse_network_subnets_replace_defaults() {
    let kdl = r#"
        stack "S" {
            network {
                subnet "Web" type="public" mask=26
                subnet "Data" type="private-isolated"
            }
        }
    "#;

    let stack = parse_kdl_string(kdl).unwrap();
    let subnets = &stack.network.subnet_configuration;
    assert_eq!(subnets.len(), 2);
    assert_eq!(subnets[0].name, "Web");
    assert_eq!(subnets[0].cidr_mask, 26);
    assert_eq!(subnets[1].subnet_type, SubnetType::PrivateIsolated);
    assert_eq!(subnets[1].cidr_mask, 24);
}

#[test]
fn test_parse_invalid_cidr() {
    let kdl = r#"
        stack "S" {
            network {
                cidr "10.0.0.1/16"
            }
        }
    "#;

    assert!(matches!(
        parse_kdl_string(kdl),
        Err(StackError::InvalidCidr(_))
    ));
}

#[test]
fn test_parse_database_overrides() {
    let kdl = r#"
        stack "S" {
            database "MigrationRDS" {
                instance-type "db.t3.small"
                allocated-storage 50
                removal-policy "snapshot"
            }
        }
    "#;

    let stack = parse_kdl_string(kdl).unwrap();
    let db = &stack.databases[0];
    assert_eq!(db.instance_type.db_class(), "db.t3.small");
    assert_eq!(db.allocated_storage, 50);
    assert_eq!(db.removal_policy, RemovalPolicy::Snapshot);
    assert_eq!(db.subnet_type, SubnetType::PrivateIsolated);
}

#[test]
fn test_parse_unknown_database_is_error() {
    let kdl = r#"
        stack "S" {
            database "Reporting" {
                allocated-storage 50
            }
        }
    "#;

    assert!(matches!(
        parse_kdl_string(kdl),
        Err(StackError::ResourceNotFound(id)) if id == "Reporting"
    ));
}

#[test]
fn test_parse_instance_role_must_exist() {
    let kdl = r#"
        stack "S" {
            instance "MigrationEC2" {
                role "AdminRole"
            }
        }
    "#;

    assert!(matches!(
        parse_kdl_string(kdl),
        Err(StackError::UnknownRole(role)) if role == "AdminRole"
    ));

    let kdl = r#"
        stack "S" {
            instance "MigrationEC2" {
                role "EC2Role"
            }
        }
    "#;
    let stack = parse_kdl_string(kdl).unwrap();
    assert_eq!(stack.instances[0].role.as_deref(), Some("EC2Role"));
}

#[test]
fn test_parse_instance_without_name_targets_first() {
    let kdl = r#"
        stack "S" {
            instance {
                instance-type "t3.small"
                key-name "ops"
            }
        }
    "#;

    let stack = parse_kdl_string(kdl).unwrap();
    let instance = &stack.instances[0];
    assert_eq!(instance.id, "MigrationEC2");
    assert_eq!(instance.instance_type.to_string(), "t3.small");
    assert_eq!(instance.key_name.as_deref(), Some("ops"));
}

#[test]
fn test_parse_ingress_added_to_existing_group() {
    let kdl = r#"
        stack "S" {
            security-group "EC2SG" {
                ingress port=443 peer="any-ipv4" description="Allow HTTPS"
            }
        }
    "#;

    let stack = parse_kdl_string(kdl).unwrap();
    let sg = stack.security_group("EC2SG").unwrap();
    assert_eq!(sg.ingress.len(), 3);
    assert!(sg.allows_from_anywhere(Port::tcp(443)));
    assert_eq!(sg.ingress[2].description.as_deref(), Some("Allow HTTPS"));
}

#[test]
fn test_parse_new_security_group() {
    let kdl = r#"
        stack "S" {
            security-group "BastionSG" {
                description "Bastion access"
                ingress port=22 peer="203.0.113.0/24"
            }
        }
    "#;

    let stack = parse_kdl_string(kdl).unwrap();
    let sg = stack.security_group("BastionSG").unwrap();
    assert_eq!(sg.description, "Bastion access");
    assert_eq!(sg.ingress[0].peer, "203.0.113.0/24".parse::<Peer>().unwrap());
}

#[test]
fn test_parse_ingress_requires_port() {
    let kdl = r#"
        stack "S" {
            security-group "EC2SG" {
                ingress peer="any-ipv4"
            }
        }
    "#;

    assert!(matches!(
        parse_kdl_string(kdl),
        Err(StackError::InvalidConfig(_))
    ));
}

#[test]
fn test_parse_unknown_nodes_are_ignored() {
    let kdl = r#"
        stack "S" {
            monitoring "enabled"
        }
        pipeline "ci"
    "#;

    let stack = parse_kdl_string(kdl).unwrap();
    assert_eq!(stack.name, "S");
}

#[test]
fn test_parse_kdl_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.kdl");
    std::fs::write(&path, r#"stack "FromFile" { region "us-east-1" }"#).unwrap();

    let stack = parse_kdl_file(&path).unwrap();
    assert_eq!(stack.name, "FromFile");
    assert_eq!(stack.region.as_deref(), Some("us-east-1"));

    assert!(matches!(
        parse_kdl_file(dir.path().join("missing.kdl")),
        Err(StackError::IoError { .. })
    ));
}
