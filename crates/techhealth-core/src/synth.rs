//! CloudFormation テンプレート生成
//!
//! [`Stack`] を外部のプロビジョニングエンジンが読む形式に変換する。
//! 論理IDは構成パスから決定的に導出されるため、同じ記述からは常に
//! 同じテンプレートが生成される。

use crate::error::{Result, StackError};
use crate::model::{
    DatabaseInstance, Instance, MachineImage, Peer, Protocol, Role, SecurityGroup, Stack, Subnet,
    SubnetType,
};
use crate::validate::validate;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
const MAX_HUMAN_LEN: usize = 240;

/// 構成パスから論理IDを導出
///
/// `Resource` / `Default` 要素と連続する重複要素を除き、英数字以外を
/// 取り除いた名前に、パス全体のハッシュ先頭8桁を付ける。
pub fn logical_id(path: &[&str]) -> String {
    let mut components: Vec<&str> = Vec::new();
    for &component in path {
        if component == "Resource" || component == "Default" {
            continue;
        }
        if components.last() == Some(&component) {
            continue;
        }
        components.push(component);
    }

    let mut human: String = components
        .concat()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    human.truncate(MAX_HUMAN_LEN);

    let digest = Sha256::digest(path.join("/").as_bytes());
    let suffix = hex::encode_upper(&digest[..4]);
    format!("{}{}", human, suffix)
}

/// 生成済みテンプレート
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    body: Value,
}

impl Template {
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// Resources セクション
    pub fn resources(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.body
            .get("Resources")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|m| m.iter())
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.body.get("Resources").and_then(|r| r.get(logical_id))
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
        self.resources()
            .filter(move |(_, r)| r.get("Type").and_then(Value::as_str) == Some(resource_type))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }
}

/// スタックを検証してテンプレートを生成
///
/// 検証エラーがあれば [`StackError::Validation`] を返す。警告はログに出す。
pub fn synthesize(stack: &Stack) -> Result<Template> {
    let report = validate(stack);
    for finding in report.warnings() {
        warn!(resource = %finding.resource, "{}", finding.message);
    }
    let errors = report.errors().count();
    if errors > 0 {
        return Err(StackError::Validation(errors));
    }

    let subnets = stack.network.allocate_subnets()?;
    let mut synth = Synthesizer::new(stack);
    synth.network(&subnets)?;
    for sg in &stack.security_groups {
        synth.security_group(sg)?;
    }
    for role in &stack.roles {
        synth.role(role)?;
    }
    for instance in &stack.instances {
        synth.instance(instance, &subnets)?;
    }
    for db in &stack.databases {
        synth.database(db, &subnets)?;
    }

    let template = synth.finish();
    debug!(
        resources = template.resources().count(),
        "Synthesized stack {}",
        stack.name
    );
    Ok(template)
}

struct Synthesizer<'a> {
    stack: &'a Stack,
    resources: Map<String, Value>,
    parameters: Map<String, Value>,
    vpc_id: String,
    igw_attachment_id: Option<String>,
}

fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

fn availability_zone(zone_index: u8) -> Value {
    json!({ "Fn::Select": [zone_index, { "Fn::GetAZs": "" }] })
}

impl<'a> Synthesizer<'a> {
    fn new(stack: &'a Stack) -> Self {
        Self {
            stack,
            resources: Map::new(),
            parameters: Map::new(),
            vpc_id: logical_id(&[&stack.network.id, "Resource"]),
            igw_attachment_id: None,
        }
    }

    fn add(&mut self, path: &[&str], resource: Value) -> Result<String> {
        let id = logical_id(path);
        if self.resources.contains_key(&id) {
            return Err(StackError::DuplicateLogicalId(format!(
                "{} ({})",
                id,
                path.join("/")
            )));
        }
        self.resources.insert(id.clone(), resource);
        Ok(id)
    }

    /// スタックタグ + Name タグ（キー順）
    fn tags(&self, name: Option<String>) -> Option<Value> {
        let mut tags = self.stack.tags.clone();
        if let Some(name) = name {
            tags.insert("Name".to_string(), name);
        }
        if tags.is_empty() {
            return None;
        }
        Some(Value::Array(
            tags.into_iter()
                .map(|(k, v)| json!({ "Key": k, "Value": v }))
                .collect(),
        ))
    }

    fn with_tags(&self, mut properties: Value, name: Option<String>) -> Value {
        if let (Some(tags), Some(obj)) = (self.tags(name), properties.as_object_mut()) {
            obj.insert("Tags".to_string(), tags);
        }
        properties
    }

    fn display_path(&self, path: &[&str]) -> String {
        format!("{}/{}", self.stack.name, path.join("/"))
    }

    fn network(&mut self, subnets: &[Subnet]) -> Result<()> {
        let stack = self.stack;
        let network = &stack.network;
        let vpc_name = self.display_path(&[&network.id]);
        let properties = self.with_tags(
            json!({
                "CidrBlock": network.cidr.to_string(),
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "InstanceTenancy": "default",
            }),
            Some(vpc_name.clone()),
        );
        self.add(
            &[&network.id, "Resource"],
            json!({ "Type": "AWS::EC2::VPC", "Properties": properties }),
        )?;

        let has_public = subnets.iter().any(|s| s.subnet_type.is_public());
        let igw_id = if has_public {
            let igw_props = self.with_tags(json!({}), Some(vpc_name));
            let igw_id = self.add(
                &[&network.id, "IGW"],
                json!({ "Type": "AWS::EC2::InternetGateway", "Properties": igw_props }),
            )?;
            let attachment = self.add(
                &[&network.id, "VPCGW"],
                json!({
                    "Type": "AWS::EC2::VPCGatewayAttachment",
                    "Properties": {
                        "InternetGatewayId": reference(&igw_id),
                        "VpcId": reference(&self.vpc_id),
                    },
                }),
            )?;
            self.igw_attachment_id = Some(attachment);
            Some(igw_id)
        } else {
            None
        };

        for subnet in subnets {
            self.subnet(subnet, igw_id.as_deref())?;
        }
        Ok(())
    }

    fn subnet(&mut self, subnet: &Subnet, igw_id: Option<&str>) -> Result<()> {
        let vpc = self.stack.network.id.clone();
        let construct = subnet.construct_id();
        let name = self.display_path(&[&vpc, &construct]);

        let mut properties = self.with_tags(
            json!({
                "AvailabilityZone": availability_zone(subnet.zone_index),
                "CidrBlock": subnet.cidr.to_string(),
                "MapPublicIpOnLaunch": subnet.subnet_type.is_public(),
                "VpcId": reference(&self.vpc_id),
            }),
            Some(name.clone()),
        );
        if let Some(tags) = properties.get_mut("Tags").and_then(Value::as_array_mut) {
            tags.push(json!({ "Key": "aws-cdk:subnet-name", "Value": subnet.group }));
            tags.push(json!({ "Key": "aws-cdk:subnet-type", "Value": subnet.subnet_type.tag_value() }));
        }
        let subnet_id = self.add(
            &[&vpc, &construct, "Subnet"],
            json!({ "Type": "AWS::EC2::Subnet", "Properties": properties }),
        )?;

        let rt_props = self.with_tags(json!({ "VpcId": reference(&self.vpc_id) }), Some(name));
        let route_table_id = self.add(
            &[&vpc, &construct, "RouteTable"],
            json!({ "Type": "AWS::EC2::RouteTable", "Properties": rt_props }),
        )?;
        self.add(
            &[&vpc, &construct, "RouteTableAssociation"],
            json!({
                "Type": "AWS::EC2::SubnetRouteTableAssociation",
                "Properties": {
                    "RouteTableId": reference(&route_table_id),
                    "SubnetId": reference(&subnet_id),
                },
            }),
        )?;

        if let (SubnetType::Public, Some(igw_id)) = (subnet.subnet_type, igw_id) {
            let depends_on = self.igw_attachment_id.clone().into_iter().collect::<Vec<_>>();
            self.add(
                &[&vpc, &construct, "DefaultRoute"],
                json!({
                    "Type": "AWS::EC2::Route",
                    "Properties": {
                        "DestinationCidrBlock": "0.0.0.0/0",
                        "GatewayId": reference(igw_id),
                        "RouteTableId": reference(&route_table_id),
                    },
                    "DependsOn": depends_on,
                }),
            )?;
        }
        Ok(())
    }

    fn security_group_id(&self, id: &str) -> String {
        logical_id(&[id, "Resource"])
    }

    fn security_group(&mut self, sg: &SecurityGroup) -> Result<()> {
        let mut cidr_ingress = Vec::new();
        let mut group_ingress = Vec::new();
        for rule in &sg.ingress {
            match &rule.peer {
                Peer::Ipv4(cidr) => {
                    let mut entry = json!({
                        "CidrIp": cidr.to_string(),
                        "FromPort": rule.port.number,
                        "IpProtocol": rule.port.protocol.to_string(),
                        "ToPort": rule.port.number,
                    });
                    let description = rule
                        .description
                        .clone()
                        .unwrap_or_else(|| format!("from {}:{}", cidr, rule.port.number));
                    entry["Description"] = json!(description);
                    cidr_ingress.push(entry);
                }
                Peer::SecurityGroup(source) => group_ingress.push((source.clone(), rule)),
            }
        }

        let mut properties = json!({
            "GroupDescription": sg.description,
            "VpcId": reference(&self.vpc_id),
        });
        if sg.allow_all_outbound {
            properties["SecurityGroupEgress"] = json!([{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }]);
        }
        if !cidr_ingress.is_empty() {
            properties["SecurityGroupIngress"] = Value::Array(cidr_ingress);
        }
        let properties = self.with_tags(properties, None);
        let group_id = self.add(
            &[&sg.id, "Resource"],
            json!({ "Type": "AWS::EC2::SecurityGroup", "Properties": properties }),
        )?;

        // グループ間のルールは循環参照を避けるため別リソースにする
        for (source, rule) in group_ingress {
            let construct = match rule.port.protocol {
                Protocol::Tcp => format!("from {}:{}", source, rule.port.number),
                protocol => format!("from {}:{}:{}", source, protocol, rule.port.number),
            };
            let description = rule
                .description
                .clone()
                .unwrap_or_else(|| construct.clone());
            self.add(
                &[&sg.id, &construct],
                json!({
                    "Type": "AWS::EC2::SecurityGroupIngress",
                    "Properties": {
                        "Description": description,
                        "FromPort": rule.port.number,
                        "GroupId": get_att(&group_id, "GroupId"),
                        "IpProtocol": rule.port.protocol.to_string(),
                        "SourceSecurityGroupId": get_att(&self.security_group_id(&source), "GroupId"),
                        "ToPort": rule.port.number,
                    },
                }),
            )?;
        }
        Ok(())
    }

    fn role_id(&self, id: &str) -> String {
        logical_id(&[id, "Resource"])
    }

    fn role(&mut self, role: &Role) -> Result<()> {
        let managed: Vec<Value> = role
            .managed_policies
            .iter()
            .map(|p| {
                json!({
                    "Fn::Join": ["", ["arn:", { "Ref": "AWS::Partition" }, p.arn_suffix()]]
                })
            })
            .collect();

        let mut properties = json!({
            "AssumeRolePolicyDocument": {
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": role.assumed_by.as_str() },
                }],
                "Version": "2012-10-17",
            },
        });
        if !managed.is_empty() {
            properties["ManagedPolicyArns"] = Value::Array(managed);
        }
        let properties = self.with_tags(properties, None);
        self.add(
            &[&role.id, "Resource"],
            json!({ "Type": "AWS::IAM::Role", "Properties": properties }),
        )?;
        Ok(())
    }

    fn image_id(&mut self, image: &MachineImage) -> Value {
        match image {
            MachineImage::Generic { ami } => json!(ami),
            MachineImage::AmazonLinux2023 { .. } => {
                let parameter = image.ssm_parameter().unwrap_or_default();
                let id = logical_id(&["SsmParameterValue", &parameter, "Parameter"]);
                self.parameters.insert(
                    id.clone(),
                    json!({
                        "Type": "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>",
                        "Default": parameter,
                    }),
                );
                reference(&id)
            }
        }
    }

    fn subnet_id(&self, subnet: &Subnet) -> String {
        logical_id(&[&self.stack.network.id, &subnet.construct_id(), "Subnet"])
    }

    fn instance(&mut self, instance: &Instance, subnets: &[Subnet]) -> Result<()> {
        // 先頭ゾーンに配置
        let subnet = subnets
            .iter()
            .find(|s| s.subnet_type == instance.subnet_type)
            .ok_or_else(|| {
                StackError::InvalidConfig(format!(
                    "{}: {} サブネットがありません",
                    instance.id, instance.subnet_type
                ))
            })?;

        let mut properties = json!({
            "AvailabilityZone": availability_zone(subnet.zone_index),
            "ImageId": self.image_id(&instance.machine_image),
            "InstanceType": instance.instance_type.to_string(),
            "SecurityGroupIds": [get_att(&self.security_group_id(&instance.security_group), "GroupId")],
            "SubnetId": reference(&self.subnet_id(subnet)),
            "UserData": { "Fn::Base64": "#!/bin/bash" },
        });
        if let Some(key_name) = &instance.key_name {
            properties["KeyName"] = json!(key_name);
        }

        let mut depends_on = Vec::new();
        if let Some(role) = &instance.role {
            let role_id = self.role_id(role);
            let profile_id = self.add(
                &[&instance.id, "InstanceProfile"],
                json!({
                    "Type": "AWS::IAM::InstanceProfile",
                    "Properties": { "Roles": [reference(&role_id)] },
                }),
            )?;
            properties["IamInstanceProfile"] = reference(&profile_id);
            depends_on.push(json!(role_id));
        }

        let name = self.display_path(&[&instance.id]);
        let properties = self.with_tags(properties, Some(name));
        let mut resource = json!({ "Type": "AWS::EC2::Instance", "Properties": properties });
        if !depends_on.is_empty() {
            resource["DependsOn"] = Value::Array(depends_on);
        }
        self.add(&[&instance.id, "Resource"], resource)?;
        Ok(())
    }

    fn database(&mut self, db: &DatabaseInstance, subnets: &[Subnet]) -> Result<()> {
        let subnet_refs: Vec<Value> = subnets
            .iter()
            .filter(|s| s.subnet_type == db.subnet_type)
            .map(|s| reference(&self.subnet_id(s)))
            .collect();
        let group_props = self.with_tags(
            json!({
                "DBSubnetGroupDescription": format!("Subnet group for {} database", db.id),
                "SubnetIds": subnet_refs,
            }),
            None,
        );
        let subnet_group_id = self.add(
            &[&db.id, "SubnetGroup", "Default"],
            json!({ "Type": "AWS::RDS::DBSubnetGroup", "Properties": group_props }),
        )?;

        let secret_template = json!({ "username": db.master_username }).to_string();
        let secret_props = self.with_tags(
            json!({
                "Description": format!("Generated master credentials for stack: {}", self.stack.name),
                "GenerateSecretString": {
                    "ExcludeCharacters": " %+~`#$&*()|[]{}:;<>?!'/@\"\\",
                    "GenerateStringKey": "password",
                    "PasswordLength": 30,
                    "SecretStringTemplate": secret_template,
                },
            }),
            None,
        );
        let secret_id = self.add(
            &[&db.id, "Secret", "Resource"],
            json!({
                "Type": "AWS::SecretsManager::Secret",
                "Properties": secret_props,
                "DeletionPolicy": "Delete",
                "UpdateReplacePolicy": "Delete",
            }),
        )?;

        let resolve = |field: &str| {
            json!({
                "Fn::Join": ["", [
                    "{{resolve:secretsmanager:",
                    { "Ref": secret_id },
                    format!(":SecretString:{}::}}}}", field),
                ]]
            })
        };

        let security_groups: Vec<Value> = db
            .security_groups
            .iter()
            .map(|sg| get_att(&self.security_group_id(sg), "GroupId"))
            .collect();

        let policy = db.removal_policy.cfn_value();
        let properties = self.with_tags(
            json!({
                "AllocatedStorage": db.allocated_storage.to_string(),
                "CopyTagsToSnapshot": true,
                "DBInstanceClass": db.instance_type.db_class(),
                "DBSubnetGroupName": reference(&subnet_group_id),
                "Engine": db.engine.name(),
                "EngineVersion": db.engine.version(),
                "MasterUsername": resolve("username"),
                "MasterUserPassword": resolve("password"),
                "PubliclyAccessible": false,
                "StorageType": "gp2",
                "VPCSecurityGroups": security_groups,
            }),
            None,
        );
        let db_id = self.add(
            &[&db.id, "Resource"],
            json!({
                "Type": "AWS::RDS::DBInstance",
                "Properties": properties,
                "DeletionPolicy": policy,
                "UpdateReplacePolicy": policy,
            }),
        )?;

        self.add(
            &[&db.id, "Secret", "Attachment"],
            json!({
                "Type": "AWS::SecretsManager::SecretTargetAttachment",
                "Properties": {
                    "SecretId": reference(&secret_id),
                    "TargetId": reference(&db_id),
                    "TargetType": "AWS::RDS::DBInstance",
                },
            }),
        )?;
        Ok(())
    }

    fn finish(self) -> Template {
        let environment = format!(
            "aws://{}/{}",
            self.stack.account.as_deref().unwrap_or("unknown-account"),
            self.stack.region.as_deref().unwrap_or("unknown-region"),
        );
        let mut body = json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": format!("{} (generated by techhealth)", self.stack.name),
            "Metadata": { "techhealth:environment": environment },
            "Resources": Value::Object(self.resources),
        });
        if !self.parameters.is_empty() {
            body["Parameters"] = Value::Object(self.parameters);
        }
        Template { body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Port, RemovalPolicy};

    fn template() -> Template {
        synthesize(&Stack::techhealth_migration()).unwrap()
    }

    fn props<'a>(template: &'a Template, path: &[&str]) -> &'a Value {
        &template.resource(&logical_id(path)).unwrap()["Properties"]
    }

    #[test]
    fn test_logical_id_is_stable_and_clean() {
        let a = logical_id(&["TechHealthVPC", "PublicSubnetSubnet1", "Subnet"]);
        let b = logical_id(&["TechHealthVPC", "PublicSubnetSubnet1", "Subnet"]);
        assert_eq!(a, b);
        assert!(a.starts_with("TechHealthVPCPublicSubnetSubnet1Subnet"));
        assert_eq!(a.len(), "TechHealthVPCPublicSubnetSubnet1Subnet".len() + 8);

        let vpc = logical_id(&["TechHealthVPC", "Resource"]);
        assert!(vpc.starts_with("TechHealthVPC"));
        assert_eq!(vpc.len(), "TechHealthVPC".len() + 8);

        let ingress = logical_id(&["RDSSG", "from EC2SG:3306"]);
        assert!(ingress.starts_with("RDSSGfromEC2SG3306"));
        assert!(ingress.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_logical_id_differs_by_path() {
        assert_ne!(
            logical_id(&["A", "Resource"]),
            logical_id(&["A", "Default"])
        );
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let a = template().to_json_pretty().unwrap();
        let b = template().to_json_pretty().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resource_counts() {
        let t = template();
        assert_eq!(t.resources_of_type("AWS::EC2::VPC").count(), 1);
        assert_eq!(t.resources_of_type("AWS::EC2::Subnet").count(), 4);
        assert_eq!(t.resources_of_type("AWS::EC2::RouteTable").count(), 4);
        // public サブネットのみデフォルトルートを持つ
        assert_eq!(t.resources_of_type("AWS::EC2::Route").count(), 2);
        assert_eq!(t.resources_of_type("AWS::EC2::SecurityGroup").count(), 2);
        assert_eq!(t.resources_of_type("AWS::EC2::SecurityGroupIngress").count(), 1);
        assert_eq!(t.resources_of_type("AWS::IAM::Role").count(), 1);
        assert_eq!(t.resources_of_type("AWS::EC2::Instance").count(), 1);
        assert_eq!(t.resources_of_type("AWS::RDS::DBInstance").count(), 1);
    }

    #[test]
    fn test_subnet_cidrs() {
        let t = template();
        let cases = [
            ("PublicSubnetSubnet1", "10.0.0.0/24", true),
            ("PublicSubnetSubnet2", "10.0.1.0/24", true),
            ("PrivateSubnetSubnet1", "10.0.2.0/24", false),
            ("PrivateSubnetSubnet2", "10.0.3.0/24", false),
        ];
        for (construct, cidr, public) in cases {
            let p = props(&t, &["TechHealthVPC", construct, "Subnet"]);
            assert_eq!(p["CidrBlock"], cidr);
            assert_eq!(p["MapPublicIpOnLaunch"], public);
        }
    }

    #[test]
    fn test_compute_ingress_from_anywhere() {
        let t = template();
        let p = props(&t, &["EC2SG", "Resource"]);
        let ingress = p["SecurityGroupIngress"].as_array().unwrap();
        let ports: Vec<u64> = ingress
            .iter()
            .map(|r| {
                assert_eq!(r["CidrIp"], "0.0.0.0/0");
                assert_eq!(r["IpProtocol"], "tcp");
                r["FromPort"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(ports, vec![22, 80]);
    }

    #[test]
    fn test_data_ingress_only_from_compute_group() {
        let t = template();
        let rds_sg = props(&t, &["RDSSG", "Resource"]);
        assert!(rds_sg.get("SecurityGroupIngress").is_none());

        let rule = props(&t, &["RDSSG", "from EC2SG:3306"]);
        assert_eq!(rule["FromPort"], 3306);
        assert_eq!(rule["ToPort"], 3306);
        assert_eq!(
            rule["SourceSecurityGroupId"],
            get_att(&logical_id(&["EC2SG", "Resource"]), "GroupId")
        );
        assert!(rule.get("CidrIp").is_none());
    }

    #[test]
    fn test_role_trust_and_policy() {
        let t = template();
        let p = props(&t, &["EC2Role", "Resource"]);
        assert_eq!(
            p["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            "ec2.amazonaws.com"
        );
        let arn = &p["ManagedPolicyArns"][0]["Fn::Join"][1][2];
        assert_eq!(arn, ":iam::aws:policy/AmazonSSMManagedInstanceCore");
    }

    #[test]
    fn test_instance_placement() {
        let t = template();
        let p = props(&t, &["MigrationEC2", "Resource"]);
        assert_eq!(p["InstanceType"], "t3.micro");
        assert_eq!(
            p["SubnetId"],
            reference(&logical_id(&["TechHealthVPC", "PublicSubnetSubnet1", "Subnet"]))
        );
        let param = p["ImageId"]["Ref"].as_str().unwrap();
        assert_eq!(
            t.body()["Parameters"][param]["Default"],
            "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-6.1-x86_64"
        );
    }

    #[test]
    fn test_database_in_isolated_subnets_with_destroy_policy() {
        let t = template();
        let db = t.resource(&logical_id(&["MigrationRDS", "Resource"])).unwrap();
        assert_eq!(db["DeletionPolicy"], "Delete");
        assert_eq!(db["UpdateReplacePolicy"], "Delete");
        assert_eq!(db["Properties"]["Engine"], "mysql");
        assert_eq!(db["Properties"]["EngineVersion"], "8.0");
        assert_eq!(db["Properties"]["DBInstanceClass"], "db.t3.micro");
        assert_eq!(db["Properties"]["AllocatedStorage"], "20");
        assert_eq!(db["Properties"]["PubliclyAccessible"], false);

        let group = props(&t, &["MigrationRDS", "SubnetGroup", "Default"]);
        let subnet_ids = group["SubnetIds"].as_array().unwrap();
        assert_eq!(
            subnet_ids,
            &vec![
                reference(&logical_id(&["TechHealthVPC", "PrivateSubnetSubnet1", "Subnet"])),
                reference(&logical_id(&["TechHealthVPC", "PrivateSubnetSubnet2", "Subnet"])),
            ]
        );
    }

    #[test]
    fn test_retain_policy_rendered() {
        let mut stack = Stack::techhealth_migration();
        stack.databases[0].removal_policy = RemovalPolicy::Retain;
        let t = synthesize(&stack).unwrap();
        let db = t.resource(&logical_id(&["MigrationRDS", "Resource"])).unwrap();
        assert_eq!(db["DeletionPolicy"], "Retain");
    }

    #[test]
    fn test_invalid_stack_is_rejected() {
        let mut stack = Stack::techhealth_migration();
        stack
            .security_group_mut("RDSSG")
            .unwrap()
            .add_ingress_rule(Peer::any_ipv4(), Port::tcp(3306), "open");
        assert!(matches!(
            synthesize(&stack),
            Err(StackError::Validation(1))
        ));
    }

    #[test]
    fn test_udp_rule_on_same_port_is_separate_resource() {
        let mut stack = Stack::techhealth_migration();
        stack.security_group_mut("RDSSG").unwrap().add_ingress_rule(
            Peer::security_group("EC2SG"),
            Port {
                protocol: Protocol::Udp,
                number: 3306,
            },
            "udp",
        );
        let t = synthesize(&stack).unwrap();
        assert_eq!(t.resources_of_type("AWS::EC2::SecurityGroupIngress").count(), 2);

        let tcp = props(&t, &["RDSSG", "from EC2SG:3306"]);
        assert_eq!(tcp["IpProtocol"], "tcp");
        let udp = props(&t, &["RDSSG", "from EC2SG:udp:3306"]);
        assert_eq!(udp["IpProtocol"], "udp");
        assert_eq!(udp["FromPort"], 3306);
    }

    #[test]
    fn test_add_rejects_existing_logical_id() {
        let stack = Stack::techhealth_migration();
        let mut synth = Synthesizer::new(&stack);
        synth
            .add(&["EC2Role", "Resource"], json!({ "Type": "AWS::IAM::Role" }))
            .unwrap();
        let result = synth.add(
            &["EC2Role", "Resource"],
            json!({ "Type": "AWS::EC2::SecurityGroup" }),
        );
        assert!(matches!(result, Err(StackError::DuplicateLogicalId(_))));
        assert_eq!(synth.resources.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_are_not_synthesized() {
        let mut stack = Stack::techhealth_migration();
        stack
            .security_groups
            .push(SecurityGroup::new("EC2Role", "collides with the role"));
        assert!(matches!(
            synthesize(&stack),
            Err(StackError::Validation(1))
        ));
    }

    #[test]
    fn test_stack_tags_applied() {
        let mut stack = Stack::techhealth_migration();
        stack.tags.insert("Project".to_string(), "techhealth".to_string());
        let t = synthesize(&stack).unwrap();

        let vpc_tags = props(&t, &["TechHealthVPC", "Resource"])["Tags"]
            .as_array()
            .unwrap();
        assert_eq!(vpc_tags[0]["Key"], "Name");
        assert_eq!(vpc_tags[1]["Key"], "Project");
        let sg_tags = props(&t, &["EC2SG", "Resource"])["Tags"].as_array().unwrap();
        assert_eq!(sg_tags.len(), 1);
    }
}
