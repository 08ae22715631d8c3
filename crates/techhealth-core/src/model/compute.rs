//! コンピュートインスタンス

use super::network::SubnetType;
use serde::{Deserialize, Serialize};

/// インスタンスファミリー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceClass {
    /// バースト可能 第3世代（BURSTABLE3）
    T3,
    T3a,
    M5,
}

impl InstanceClass {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceClass::T3 => "t3",
            InstanceClass::T3a => "t3a",
            InstanceClass::M5 => "m5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceSize {
    Nano,
    Micro,
    Small,
    Medium,
    Large,
}

impl InstanceSize {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceSize::Nano => "nano",
            InstanceSize::Micro => "micro",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
            InstanceSize::Large => "large",
        }
    }
}

/// インスタンスタイプ（t3.micro など）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    pub class: InstanceClass,
    pub size: InstanceSize,
}

impl InstanceType {
    pub fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }

    /// RDS向けの表記（db.t3.micro）
    pub fn db_class(&self) -> String {
        format!("db.{}", self)
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.class.as_str(), self.size.as_str())
    }
}

impl std::str::FromStr for InstanceType {
    type Err = String;

    /// `t3.micro` / `db.t3.micro`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("db.").unwrap_or(s);
        let (class, size) = s
            .split_once('.')
            .ok_or_else(|| format!("invalid instance type: {}", s))?;
        let class = match class {
            "t3" | "burstable3" => InstanceClass::T3,
            "t3a" => InstanceClass::T3a,
            "m5" => InstanceClass::M5,
            other => return Err(format!("unsupported instance class: {}", other)),
        };
        let size = match size {
            "nano" => InstanceSize::Nano,
            "micro" => InstanceSize::Micro,
            "small" => InstanceSize::Small,
            "medium" => InstanceSize::Medium,
            "large" => InstanceSize::Large,
            other => return Err(format!("unsupported instance size: {}", other)),
        };
        Ok(Self { class, size })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmazonLinux2023Kernel {
    Kernel6_1,
}

impl AmazonLinux2023Kernel {
    fn ssm_name(&self) -> &'static str {
        match self {
            AmazonLinux2023Kernel::Kernel6_1 => "kernel-6.1",
        }
    }
}

/// 起動イメージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MachineImage {
    /// Amazon Linux 2023 の最新AMI（SSMパラメータで解決）
    AmazonLinux2023 { kernel: AmazonLinux2023Kernel },
    /// 固定のAMI ID
    Generic { ami: String },
}

impl MachineImage {
    pub fn latest_amazon_linux_2023(kernel: AmazonLinux2023Kernel) -> Self {
        MachineImage::AmazonLinux2023 { kernel }
    }

    /// デプロイ時に解決されるSSMパラメータ名
    pub fn ssm_parameter(&self) -> Option<String> {
        match self {
            MachineImage::AmazonLinux2023 { kernel } => Some(format!(
                "/aws/service/ami-amazon-linux-latest/al2023-ami-{}-x86_64",
                kernel.ssm_name()
            )),
            MachineImage::Generic { .. } => None,
        }
    }
}

/// 仮想マシン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,

    pub instance_type: InstanceType,

    pub machine_image: MachineImage,

    /// 配置するサブネットの種別
    pub subnet_type: SubnetType,

    pub security_group: String,

    pub role: Option<String>,

    /// SSHキーペア名
    pub key_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_type_display() {
        let t = InstanceType::of(InstanceClass::T3, InstanceSize::Micro);
        assert_eq!(t.to_string(), "t3.micro");
        assert_eq!(t.db_class(), "db.t3.micro");
    }

    #[test]
    fn test_instance_type_from_str() {
        assert_eq!(
            "db.t3.micro".parse::<InstanceType>(),
            Ok(InstanceType::of(InstanceClass::T3, InstanceSize::Micro))
        );
        assert_eq!(
            "burstable3.small".parse::<InstanceType>(),
            Ok(InstanceType::of(InstanceClass::T3, InstanceSize::Small))
        );
        assert!("t3".parse::<InstanceType>().is_err());
        assert!("x1.micro".parse::<InstanceType>().is_err());
    }

    #[test]
    fn test_ssm_parameter() {
        let image = MachineImage::latest_amazon_linux_2023(AmazonLinux2023Kernel::Kernel6_1);
        assert_eq!(
            image.ssm_parameter().as_deref(),
            Some("/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-6.1-x86_64")
        );
        let fixed = MachineImage::Generic {
            ami: "ami-0123".to_string(),
        };
        assert!(fixed.ssm_parameter().is_none());
    }
}
