use std::fmt;
use std::str::FromStr;

/// How a table ticker turns into the identifier the price endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdResolution {
    /// The lower-cased ticker is the identifier.
    Direct,
    /// Fetch `{site_route}/{ticker}/` and read `attribute` off the first element that
    /// carries it.
    ScrapeAttribute {
        site_route: &'static str,
        attribute: &'static str,
    },
}

/// Where an instrument class fetches its price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRoute {
    pub api_route: &'static str,
    pub resolution: IdResolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Stock,
    Fii,
    Crypto,
    Etf,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 4] = [
        InstrumentKind::Stock,
        InstrumentKind::Fii,
        InstrumentKind::Crypto,
        InstrumentKind::Etf,
    ];

    /// Element id of the portfolio table for this class.
    pub fn table_id(self) -> &'static str {
        match self {
            InstrumentKind::Stock => "Ticker-tickers",
            InstrumentKind::Fii => "Fii-tickers",
            InstrumentKind::Crypto => "Crypto-tickers",
            InstrumentKind::Etf => "Etf-tickers",
        }
    }

    pub fn from_table_id(id: &str) -> Option<Self> {
        let id = id.trim_start_matches('#');
        Self::ALL.into_iter().find(|k| k.table_id() == id)
    }

    /// `None` for classes the site has no chart endpoint for.
    pub fn history_route(self) -> Option<HistoryRoute> {
        match self {
            InstrumentKind::Stock => Some(HistoryRoute {
                api_route: "api/cotacoes/acao/chart",
                resolution: IdResolution::Direct,
            }),
            InstrumentKind::Fii => Some(HistoryRoute {
                api_route: "api/fii/cotacoes/chart",
                resolution: IdResolution::ScrapeAttribute {
                    site_route: "fiis",
                    attribute: "data-company-id",
                },
            }),
            InstrumentKind::Crypto | InstrumentKind::Etf => None,
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_id())
    }
}

impl FromStr for InstrumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_table_id(s).ok_or_else(|| {
            let known: Vec<_> = Self::ALL.iter().map(|k| k.table_id()).collect();
            format!("unknown table id {s:?} (expected one of {})", known.join(", "))
        })
    }
}

/// Figures the summary strip can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    Variation,
    DividendYield,
    YieldOnCost,
}

/// One tracked table and the summary figures it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub kind: InstrumentKind,
    pub fields: &'static [SummaryField],
}

pub const TRACKED: &[Instrument] = &[
    Instrument {
        kind: InstrumentKind::Stock,
        fields: &[
            SummaryField::DividendYield,
            SummaryField::YieldOnCost,
            SummaryField::Variation,
        ],
    },
    Instrument {
        kind: InstrumentKind::Fii,
        fields: &[
            SummaryField::DividendYield,
            SummaryField::YieldOnCost,
            SummaryField::Variation,
        ],
    },
    Instrument {
        kind: InstrumentKind::Crypto,
        fields: &[SummaryField::Variation],
    },
    Instrument {
        kind: InstrumentKind::Etf,
        fields: &[SummaryField::Variation],
    },
];
