//! ネットワークトポロジー
//!
//! VPCとゾーンごとのサブネット構成の定義

use crate::cidr::Ipv4Cidr;
use serde::{Deserialize, Serialize};

/// サブネットの到達性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetType {
    /// インターネットゲートウェイ経由で到達可能
    Public,
    /// NAT経由で外向き通信のみ可能
    PrivateWithEgress,
    /// 外部との経路を一切持たない
    PrivateIsolated,
}

impl SubnetType {
    /// インターネットから到達可能か
    pub fn is_public(&self) -> bool {
        matches!(self, SubnetType::Public)
    }

    /// `aws-cdk:subnet-type` タグの値
    pub fn tag_value(&self) -> &'static str {
        match self {
            SubnetType::Public => "Public",
            SubnetType::PrivateWithEgress => "Private",
            SubnetType::PrivateIsolated => "Isolated",
        }
    }
}

impl std::str::FromStr for SubnetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "public" => Ok(SubnetType::Public),
            "private-with-egress" | "private" => Ok(SubnetType::PrivateWithEgress),
            "private-isolated" | "isolated" => Ok(SubnetType::PrivateIsolated),
            other => Err(format!("unknown subnet type: {}", other)),
        }
    }
}

impl std::fmt::Display for SubnetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubnetType::Public => write!(f, "public"),
            SubnetType::PrivateWithEgress => write!(f, "private-with-egress"),
            SubnetType::PrivateIsolated => write!(f, "private-isolated"),
        }
    }
}

/// サブネットグループの定義（ゾーンごとに1つずつ作られる）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetConfiguration {
    /// グループ名（PublicSubnet, PrivateSubnet など）
    pub name: String,

    pub subnet_type: SubnetType,

    /// サブネットのプレフィックス長
    pub cidr_mask: u8,
}

impl SubnetConfiguration {
    pub fn new(name: impl Into<String>, subnet_type: SubnetType, cidr_mask: u8) -> Self {
        Self {
            name: name.into(),
            subnet_type,
            cidr_mask,
        }
    }
}

/// 分離されたアドレス空間
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,

    pub cidr: Ipv4Cidr,

    /// 使用するアベイラビリティゾーン数
    pub max_azs: u8,

    pub subnet_configuration: Vec<SubnetConfiguration>,
}

/// 割り当て済みのサブネット
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// 所属グループ名
    pub group: String,

    pub subnet_type: SubnetType,

    /// ゾーン番号（0始まり）
    pub zone_index: u8,

    pub cidr: Ipv4Cidr,
}

impl Subnet {
    /// 構成パス上の名前（PublicSubnetSubnet1 など）
    pub fn construct_id(&self) -> String {
        format!("{}Subnet{}", self.group, self.zone_index + 1)
    }
}

impl Network {
    pub fn new(id: impl Into<String>, cidr: Ipv4Cidr, max_azs: u8) -> Self {
        Self {
            id: id.into(),
            cidr,
            max_azs,
            subnet_configuration: Vec::new(),
        }
    }

    pub fn with_subnet(mut self, config: SubnetConfiguration) -> Self {
        self.subnet_configuration.push(config);
        self
    }

    /// 指定したタイプのサブネットグループが存在するか
    pub fn has_subnet_type(&self, subnet_type: SubnetType) -> bool {
        self.subnet_configuration
            .iter()
            .any(|c| c.subnet_type == subnet_type)
    }

    /// 全サブネットのアドレスを割り当てる
    ///
    /// 構成の宣言順に、グループごとに全ゾーン分を連続して割り当てる。
    pub fn allocate_subnets(&self) -> crate::Result<Vec<Subnet>> {
        let mut allocator = self.cidr.allocator();
        let mut subnets = Vec::new();
        for config in &self.subnet_configuration {
            for zone_index in 0..self.max_azs {
                let cidr = allocator.allocate(config.cidr_mask)?;
                subnets.push(Subnet {
                    group: config.name.clone(),
                    subnet_type: config.subnet_type,
                    zone_index,
                    cidr,
                });
            }
        }
        Ok(subnets)
    }
}
