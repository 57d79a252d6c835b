use crate::chains::Blockchain;
use crate::storage::{WalletKey, WalletType};

/// Tether on Ethereum (ERC-20)
pub const USDT_ERC20_CONTRACT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
/// Tether on Tron (TRC-20)
pub const USDT_TRC20_CONTRACT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// One `(blockchain, currency)` wallet every user should have
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletTarget {
    pub blockchain: Blockchain,
    pub currency_symbol: String,
    pub wallet_type: WalletType,
}

impl WalletTarget {
    pub fn native(blockchain: Blockchain) -> Self {
        Self {
            blockchain,
            currency_symbol: blockchain.native_symbol().to_string(),
            wallet_type: WalletType::Native,
        }
    }

    pub fn token(blockchain: Blockchain, symbol: &str, contract: &str, decimals: u32) -> Self {
        Self {
            blockchain,
            currency_symbol: symbol.to_string(),
            wallet_type: WalletType::Token {
                contract: contract.to_string(),
                decimals,
            },
        }
    }

    pub fn key(&self) -> WalletKey {
        WalletKey::new(self.blockchain, &self.currency_symbol)
    }
}

/// Native coin of every supported chain plus USDT on Ethereum and Tron
pub fn default_targets() -> Vec<WalletTarget> {
    let mut targets: Vec<_> = Blockchain::ALL.iter().map(|c| WalletTarget::native(*c)).collect();
    targets.push(WalletTarget::token(Blockchain::Ethereum, "USDT", USDT_ERC20_CONTRACT, 6));
    targets.push(WalletTarget::token(Blockchain::Tron, "USDT", USDT_TRC20_CONTRACT, 6));
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_targets_are_unique() {
        let targets = default_targets();
        assert_eq!(targets.len(), 8);
        let keys: HashSet<_> = targets.iter().map(|t| t.key()).collect();
        assert_eq!(keys.len(), targets.len());
    }

    #[test]
    fn test_usdt_targets() {
        let usdt: Vec<_> = default_targets()
            .into_iter()
            .filter(|t| t.currency_symbol == "USDT")
            .map(|t| t.blockchain)
            .collect();
        assert_eq!(usdt, vec![Blockchain::Ethereum, Blockchain::Tron]);
    }
}
