//! アクセス制御ルール（セキュリティグループ）

use crate::cidr::Ipv4Cidr;
use serde::{Deserialize, Serialize};

/// プロトコル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// 単一ポート
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub protocol: Protocol,
    pub number: u16,
}

impl Port {
    pub fn tcp(number: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            number,
        }
    }

    pub fn udp(number: u16) -> Self {
        Self {
            protocol: Protocol::Udp,
            number,
        }
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.protocol, self.number)
    }
}

/// 通信元
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Peer {
    /// IPv4アドレスブロック
    Ipv4(Ipv4Cidr),
    /// 別のセキュリティグループに属するリソース
    SecurityGroup(String),
}

impl Peer {
    /// 任意のIPv4アドレス (`0.0.0.0/0`)
    pub fn any_ipv4() -> Self {
        Peer::Ipv4(Ipv4Cidr::any())
    }

    pub fn security_group(id: impl Into<String>) -> Self {
        Peer::SecurityGroup(id.into())
    }

    pub fn is_any_ipv4(&self) -> bool {
        matches!(self, Peer::Ipv4(cidr) if cidr.is_any())
    }
}

impl std::str::FromStr for Peer {
    type Err = String;

    /// `any-ipv4` / `sg:<id>` / `<cidr>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "any-ipv4" {
            return Ok(Peer::any_ipv4());
        }
        if let Some(id) = s.strip_prefix("sg:") {
            return Ok(Peer::security_group(id));
        }
        s.parse::<Ipv4Cidr>()
            .map(Peer::Ipv4)
            .map_err(|e| e.to_string())
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Peer::Ipv4(cidr) => write!(f, "{}", cidr),
            Peer::SecurityGroup(id) => write!(f, "sg:{}", id),
        }
    }
}

/// 受信許可ルール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: Port,
    pub description: Option<String>,
}

/// 受信許可ルールの集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,

    pub description: String,

    /// 外向き通信を全て許可するか
    pub allow_all_outbound: bool,

    pub ingress: Vec<IngressRule>,
}

impl SecurityGroup {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            allow_all_outbound: true,
            ingress: Vec::new(),
        }
    }

    pub fn add_ingress_rule(&mut self, peer: Peer, port: Port, description: impl Into<String>) {
        self.ingress.push(IngressRule {
            peer,
            port,
            description: Some(description.into()),
        });
    }

    /// 指定ポートへの受信を許可しているルール
    pub fn rules_for(&self, port: Port) -> impl Iterator<Item = &IngressRule> {
        self.ingress.iter().filter(move |r| r.port == port)
    }

    /// 指定ポートが任意のIPv4から開いているか
    pub fn allows_from_anywhere(&self, port: Port) -> bool {
        self.rules_for(port).any(|r| r.peer.is_any_ipv4())
    }
}
