//! IPv4 CIDR とサブネットの切り出し

use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// IPv4 アドレスブロック（ネットワークアドレス + プレフィックス長）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// ホスト部が0でなければエラー
    pub fn new(network: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(StackError::InvalidCidr(format!("{}/{}", network, prefix)));
        }
        let cidr = Self { network, prefix };
        if u32::from(network) & !cidr.mask() != 0 {
            return Err(StackError::InvalidCidr(format!(
                "{}/{} (ホスト部が0ではありません)",
                network, prefix
            )));
        }
        Ok(cidr)
    }

    /// 検証済みの値から直接組み立てる
    pub(crate) const fn from_raw(network: Ipv4Addr, prefix: u8) -> Self {
        Self { network, prefix }
    }

    /// 全IPv4アドレス (`0.0.0.0/0`)
    pub fn any() -> Self {
        Self {
            network: Ipv4Addr::UNSPECIFIED,
            prefix: 0,
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    /// ブロック内のアドレス数
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask() == u32::from(self.network)
    }

    /// `other` がこのブロックに完全に含まれるか
    pub fn contains_cidr(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix && self.contains(other.network)
    }

    pub fn is_any(&self) -> bool {
        self.prefix == 0
    }

    /// `prefix` 長で分割したときの `index` 番目のブロック
    pub fn subnet(&self, prefix: u8, index: u32) -> Result<Ipv4Cidr> {
        let exhausted = || StackError::AddressSpaceExhausted {
            cidr: self.to_string(),
            mask: prefix,
        };
        if prefix < self.prefix || prefix > 32 {
            return Err(exhausted());
        }
        let count = 1u64 << (prefix - self.prefix);
        if u64::from(index) >= count {
            return Err(exhausted());
        }
        let offset = u64::from(index) * (1u64 << (32 - prefix));
        let base = u64::from(u32::from(self.network)) + offset;
        Ipv4Cidr::new(Ipv4Addr::from(base as u32), prefix)
    }

    /// ブロックの先頭から順にサブネットを切り出すアロケータ
    pub fn allocator(&self) -> CidrAllocator {
        CidrAllocator {
            parent: *self,
            offset: 0,
        }
    }
}

impl std::str::FromStr for Ipv4Cidr {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| StackError::InvalidCidr(s.to_string()))?;
        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| StackError::InvalidCidr(s.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| StackError::InvalidCidr(s.to_string()))?;
        Self::new(network, prefix)
    }
}

impl std::fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

/// 連続割り当て
///
/// 要求されたプレフィックス長の境界に揃えてから割り当てる。
#[derive(Debug, Clone)]
pub struct CidrAllocator {
    parent: Ipv4Cidr,
    offset: u64,
}

impl CidrAllocator {
    pub fn allocate(&mut self, mask: u8) -> Result<Ipv4Cidr> {
        if mask < self.parent.prefix || mask > 32 {
            return Err(StackError::AddressSpaceExhausted {
                cidr: self.parent.to_string(),
                mask,
            });
        }
        let size = 1u64 << (32 - mask);
        let start = self.offset.div_ceil(size) * size;
        if start + size > self.parent.size() {
            return Err(StackError::AddressSpaceExhausted {
                cidr: self.parent.to_string(),
                mask,
            });
        }
        self.offset = start + size;

        let base = u64::from(u32::from(self.parent.network)) + start;
        let network = Ipv4Addr::from(base as u32);
        Ipv4Cidr::new(network, mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let cidr: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(cidr.prefix(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
        assert_eq!(cidr.size(), 65536);
    }

    #[test]
    fn test_parse_rejects_host_bits() {
        assert!("10.0.0.1/16".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("10.0.0.0".parse::<Ipv4Cidr>().is_err());
        assert!("not-an-ip/8".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn test_any() {
        let any: Ipv4Cidr = "0.0.0.0/0".parse().unwrap();
        assert_eq!(any, Ipv4Cidr::any());
        assert!(any.is_any());
        assert!(any.contains("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_contains_cidr() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let inside: Ipv4Cidr = "10.0.3.0/24".parse().unwrap();
        let outside: Ipv4Cidr = "10.1.0.0/24".parse().unwrap();
        assert!(vpc.contains_cidr(&inside));
        assert!(!vpc.contains_cidr(&outside));
        assert!(!inside.contains_cidr(&vpc));
    }

    #[test]
    fn test_subnet_by_index() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(vpc.subnet(24, 0).unwrap().to_string(), "10.0.0.0/24");
        assert_eq!(vpc.subnet(24, 3).unwrap().to_string(), "10.0.3.0/24");
        assert_eq!(vpc.subnet(24, 255).unwrap().to_string(), "10.0.255.0/24");
        assert!(vpc.subnet(24, 256).is_err());
        assert!(vpc.subnet(8, 0).is_err());
    }

    #[test]
    fn test_allocator_aligns_mixed_masks() {
        let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let mut alloc = vpc.allocator();
        assert_eq!(alloc.allocate(26).unwrap().to_string(), "10.0.0.0/26");
        // 次の /24 境界まで進む
        assert_eq!(alloc.allocate(24).unwrap().to_string(), "10.0.1.0/24");
        assert_eq!(alloc.allocate(26).unwrap().to_string(), "10.0.2.0/26");
    }

    #[test]
    fn test_allocator_exhausted() {
        let small: Ipv4Cidr = "192.168.0.0/24".parse().unwrap();
        let mut alloc = small.allocator();
        alloc.allocate(25).unwrap();
        alloc.allocate(25).unwrap();
        assert!(matches!(
            alloc.allocate(25),
            Err(StackError::AddressSpaceExhausted { mask: 25, .. })
        ));
        assert!(small.allocator().allocate(16).is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let cidr: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let json = serde_json::to_string(&cidr).unwrap();
        assert_eq!(json, "\"10.0.0.0/16\"");
        let back: Ipv4Cidr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cidr);
    }
}
