use clap::ValueEnum;
use std::fmt;

/// An advertising data source loaded as an independent unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Feed {
    MetaAds,
    GoogleAds,
}

impl Feed {
    /// Feeds in the order a full run processes them.
    pub const ALL: [Feed; 2] = [Feed::MetaAds, Feed::GoogleAds];

    pub fn label(&self) -> &'static str {
        match self {
            Feed::MetaAds => "Meta Ads",
            Feed::GoogleAds => "Google Ads",
        }
    }

    /// Shared credential key holding the worksheet name.
    pub(crate) fn worksheet_key(&self) -> &'static str {
        match self {
            Feed::MetaAds => "tabela_metaads",
            Feed::GoogleAds => "tabela_googleads",
        }
    }

    /// Client credential key holding the destination table.
    pub(crate) fn table_key(&self) -> &'static str {
        match self {
            Feed::MetaAds => "tabela_bd_meta",
            Feed::GoogleAds => "tabela_bd_google",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
