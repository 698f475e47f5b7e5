//! Choosing a provider among the objects wallets inject into the page.
//!
//! Wallets announce themselves in three places: a wallet-specific global,
//! the `ethereum.providers` array when several extensions coexist, and
//! `is*` flags on `window.ethereum` itself. The host reads those places;
//! the choice between them lives here.

/// Wallet-specific globals, most preferred first.
pub const NAMED_GLOBALS: [&str; 2] = ["safepalProvider", "trustwallet"];

/// Identity flags a provider object may carry (`isSafePal`, `isTrust`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletFlags {
    pub safe_pal: bool,
    pub trust: bool,
    pub meta_mask: bool,
    pub token_pocket: bool,
    pub coinbase: bool,
}

impl WalletFlags {
    /// JS property names, in the order `from_lookup` reads them.
    pub const PROPERTIES: [&'static str; 5] = [
        "isSafePal",
        "isTrust",
        "isMetaMask",
        "isTokenPocket",
        "isCoinbaseWallet",
    ];

    /// Build from a property lookup on the injected object.
    pub fn from_lookup(mut has: impl FnMut(&str) -> bool) -> Self {
        Self {
            safe_pal: has(Self::PROPERTIES[0]),
            trust: has(Self::PROPERTIES[1]),
            meta_mask: has(Self::PROPERTIES[2]),
            token_pocket: has(Self::PROPERTIES[3]),
            coinbase: has(Self::PROPERTIES[4]),
        }
    }

    /// Preference rank; lower wins, `None` for an anonymous provider.
    pub fn rank(&self) -> Option<usize> {
        [
            self.safe_pal,
            self.trust,
            self.meta_mask,
            self.token_pocket,
            self.coinbase,
        ]
        .iter()
        .position(|flag| *flag)
    }
}

/// Where the chosen provider came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPoint {
    NamedGlobal(&'static str),
    ProvidersArray(usize),
    Ethereum,
}

/// One snapshot of everything injected into the page.
#[derive(Debug)]
pub struct Injected<P> {
    /// First present entry of `NAMED_GLOBALS`.
    pub named: Option<(&'static str, P)>,
    /// `ethereum.providers`, in page order.
    pub providers: Vec<(P, WalletFlags)>,
    pub ethereum: Option<(P, WalletFlags)>,
}

impl<P> Default for Injected<P> {
    fn default() -> Self {
        Self {
            named: None,
            providers: Vec::new(),
            ethereum: None,
        }
    }
}

/// Named global first, then the best-ranked entry of the providers array
/// (first entry if none is recognized), then `window.ethereum` itself.
pub fn select_provider<P>(injected: Injected<P>) -> Option<(P, InjectionPoint)> {
    let Injected {
        named,
        providers,
        ethereum,
    } = injected;

    if let Some((name, provider)) = named {
        return Some((provider, InjectionPoint::NamedGlobal(name)));
    }

    if !providers.is_empty() {
        let best = providers
            .iter()
            .enumerate()
            .filter_map(|(index, (_, flags))| flags.rank().map(|rank| (rank, index)))
            .min()
            .map_or(0, |(_, index)| index);
        if let Some((provider, _)) = providers.into_iter().nth(best) {
            return Some((provider, InjectionPoint::ProvidersArray(best)));
        }
    }

    ethereum.map(|(provider, _)| (provider, InjectionPoint::Ethereum))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(names: &[&str]) -> WalletFlags {
        WalletFlags::from_lookup(|property| names.contains(&property))
    }

    #[test]
    fn named_global_wins() {
        let injected = Injected {
            named: Some(("safepalProvider", "safepal")),
            providers: vec![("metamask", flags(&["isMetaMask"]))],
            ethereum: Some(("ethereum", flags(&["isMetaMask"]))),
        };
        assert_eq!(
            select_provider(injected),
            Some(("safepal", InjectionPoint::NamedGlobal("safepalProvider")))
        );
    }

    #[test]
    fn providers_array_picks_by_flags() {
        let injected = Injected {
            named: None,
            providers: vec![
                ("coinbase", flags(&["isCoinbaseWallet"])),
                ("unknown", WalletFlags::default()),
                ("trust", flags(&["isTrust"])),
                ("metamask", flags(&["isMetaMask"])),
            ],
            ethereum: Some(("ethereum", WalletFlags::default())),
        };
        assert_eq!(
            select_provider(injected),
            Some(("trust", InjectionPoint::ProvidersArray(2)))
        );

        let anonymous = Injected {
            named: None,
            providers: vec![("first", WalletFlags::default()), ("second", WalletFlags::default())],
            ethereum: None,
        };
        assert_eq!(
            select_provider(anonymous),
            Some(("first", InjectionPoint::ProvidersArray(0)))
        );
    }

    #[test]
    fn falls_back_to_plain_ethereum() {
        let injected = Injected {
            named: None,
            providers: Vec::new(),
            ethereum: Some(("ethereum", flags(&["isTokenPocket"]))),
        };
        assert_eq!(select_provider(injected), Some(("ethereum", InjectionPoint::Ethereum)));
        assert_eq!(select_provider(Injected::<&str>::default()), None);
    }

    #[test]
    fn flag_ranking() {
        assert_eq!(flags(&["isMetaMask", "isTrust"]).rank(), Some(1));
        assert_eq!(flags(&["isCoinbaseWallet"]).rank(), Some(4));
        assert_eq!(WalletFlags::default().rank(), None);
    }
}
