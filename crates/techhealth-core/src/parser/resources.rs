//! リソースノードのパース

use super::{all_strings, first_integer, first_string, prop_integer, prop_string};
use crate::error::{Result, StackError};
use crate::model::{
    IngressRule, InstanceType, Network, Peer, Port, Protocol, RemovalPolicy, SecurityGroup,
    Stack, SubnetConfiguration, SubnetType,
};
use kdl::KdlNode;

fn invalid(message: impl Into<String>) -> StackError {
    StackError::InvalidConfig(message.into())
}

fn required_string(node: &KdlNode) -> Result<String> {
    first_string(node)
        .ok_or_else(|| invalid(format!("'{}' requires a string value", node.name().value())))
}

fn required_integer(node: &KdlNode) -> Result<i128> {
    first_integer(node)
        .ok_or_else(|| invalid(format!("'{}' requires an integer value", node.name().value())))
}

fn parse_subnet_type(node: &KdlNode, value: &str) -> Result<SubnetType> {
    value
        .parse()
        .map_err(|e: String| invalid(format!("{}: {}", node.name().value(), e)))
}

fn parse_instance_type(node: &KdlNode) -> Result<InstanceType> {
    required_string(node)?
        .parse()
        .map_err(|e: String| invalid(format!("{}: {}", node.name().value(), e)))
}

/// network ノード
///
/// `subnet` 子ノードが1つでもあればサブネット構成を置き換える。
pub fn apply_network(network: &mut Network, node: &KdlNode) -> Result<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    let mut subnets = Vec::new();
    for child in children.nodes() {
        match child.name().value() {
            "cidr" => network.cidr = required_string(child)?.parse()?,
            "max-azs" | "max_azs" => {
                let azs = required_integer(child)?;
                network.max_azs = u8::try_from(azs)
                    .map_err(|_| invalid(format!("max-azs out of range: {}", azs)))?;
            }
            "subnet" => {
                let name = required_string(child)?;
                let subnet_type = match prop_string(child, "type") {
                    Some(t) => parse_subnet_type(child, &t)?,
                    None => return Err(invalid(format!("subnet '{}' requires type=", name))),
                };
                let mask = prop_integer(child, "mask").unwrap_or(24);
                let mask = u8::try_from(mask)
                    .ok()
                    .filter(|m| *m <= 32)
                    .ok_or_else(|| invalid(format!("subnet '{}' mask out of range", name)))?;
                subnets.push(SubnetConfiguration::new(name, subnet_type, mask));
            }
            other => tracing::warn!(node = other, "Unknown network node, ignoring"),
        }
    }

    if !subnets.is_empty() {
        network.subnet_configuration = subnets;
    }
    Ok(())
}

/// security-group ノード
///
/// 既存グループなら設定とルールを追加し、なければ新規に作る。
pub fn apply_security_group(stack: &mut Stack, node: &KdlNode) -> Result<()> {
    let id = required_string(node)?;
    let index = match stack.security_groups.iter().position(|g| g.id == id) {
        Some(index) => index,
        None => {
            stack
                .security_groups
                .push(SecurityGroup::new(id.clone(), id.clone()));
            stack.security_groups.len() - 1
        }
    };
    let group = &mut stack.security_groups[index];

    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match child.name().value() {
            "description" => group.description = required_string(child)?,
            "ingress" => group.ingress.push(parse_ingress(child)?),
            other => tracing::warn!(node = other, "Unknown security-group node, ignoring"),
        }
    }
    Ok(())
}

/// `ingress port=3306 peer="sg:EC2SG" protocol="tcp" description="..."`
fn parse_ingress(node: &KdlNode) -> Result<IngressRule> {
    let number = prop_integer(node, "port").ok_or_else(|| invalid("ingress requires port="))?;
    let number =
        u16::try_from(number).map_err(|_| invalid(format!("port out of range: {}", number)))?;
    let protocol = match prop_string(node, "protocol").as_deref() {
        None | Some("tcp") => Protocol::Tcp,
        Some("udp") => Protocol::Udp,
        Some(other) => return Err(invalid(format!("unsupported protocol: {}", other))),
    };
    let peer: Peer = prop_string(node, "peer")
        .ok_or_else(|| invalid("ingress requires peer="))?
        .parse()
        .map_err(|e: String| invalid(format!("ingress peer: {}", e)))?;

    Ok(IngressRule {
        peer,
        port: Port { protocol, number },
        description: prop_string(node, "description"),
    })
}

/// instance ノード（名前省略時は先頭のインスタンス）
///
/// `role` はスタックに存在するロールのみ指定できる。
pub fn apply_instance(stack: &mut Stack, node: &KdlNode) -> Result<()> {
    let known_roles: Vec<String> = stack.roles.iter().map(|r| r.id.clone()).collect();
    let instance = match first_string(node) {
        Some(id) => stack
            .instance_mut(&id)
            .ok_or(StackError::ResourceNotFound(id))?,
        None => stack
            .instances
            .first_mut()
            .ok_or_else(|| StackError::ResourceNotFound("instance".to_string()))?,
    };

    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match child.name().value() {
            "instance-type" | "instance_type" => {
                instance.instance_type = parse_instance_type(child)?
            }
            "subnet" => instance.subnet_type = parse_subnet_type(child, &required_string(child)?)?,
            "key-name" | "key_name" => instance.key_name = Some(required_string(child)?),
            "security-group" | "security_group" => {
                instance.security_group = required_string(child)?
            }
            "role" => {
                let role = required_string(child)?;
                if !known_roles.contains(&role) {
                    return Err(StackError::UnknownRole(role));
                }
                instance.role = Some(role);
            }
            other => tracing::warn!(node = other, "Unknown instance node, ignoring"),
        }
    }
    Ok(())
}

/// database ノード（名前省略時は先頭のデータベース）
pub fn apply_database(stack: &mut Stack, node: &KdlNode) -> Result<()> {
    let database = match first_string(node) {
        Some(id) => stack
            .database_mut(&id)
            .ok_or(StackError::ResourceNotFound(id))?,
        None => stack
            .databases
            .first_mut()
            .ok_or_else(|| StackError::ResourceNotFound("database".to_string()))?,
    };

    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match child.name().value() {
            "instance-type" | "instance_type" => {
                database.instance_type = parse_instance_type(child)?
            }
            "allocated-storage" | "allocated_storage" => {
                let gib = required_integer(child)?;
                database.allocated_storage = u32::try_from(gib)
                    .map_err(|_| invalid(format!("allocated-storage out of range: {}", gib)))?;
            }
            "subnet" => database.subnet_type = parse_subnet_type(child, &required_string(child)?)?,
            "removal-policy" | "removal_policy" => {
                database.removal_policy = required_string(child)?
                    .parse::<RemovalPolicy>()
                    .map_err(invalid)?
            }
            "master-username" | "master_username" => {
                database.master_username = required_string(child)?
            }
            "security-groups" | "security_groups" => database.security_groups = all_strings(child),
            other => tracing::warn!(node = other, "Unknown database node, ignoring"),
        }
    }
    Ok(())
}
