//! Catalogs of the supported economic indicators and commodities, with the
//! parameter combinations each upstream endpoint accepts.

use crate::error::{DataError, Result};

/// Economic indicators served by the Alpha Vantage economic endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EconIndicator {
    RealGdp,
    RealGdpPerCapita,
    TreasuryYield,
    FederalFundsRate,
    Cpi,
    Inflation,
    RetailSales,
    Durables,
    Unemployment,
    NonfarmPayroll,
}

impl EconIndicator {
    pub const ALL_KEYS: &'static [&'static str] = &[
        "real_gdp",
        "real_gdp_per_capita",
        "treasury_yield",
        "federal_funds_rate",
        "cpi",
        "inflation",
        "retail_sales",
        "durables",
        "unemployment",
        "nonfarm_payroll",
    ];

    const TREASURY_MATURITIES: &'static [&'static str] =
        &["3month", "2year", "5year", "7year", "10year", "30year"];

    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "real_gdp" => Ok(Self::RealGdp),
            "real_gdp_per_capita" => Ok(Self::RealGdpPerCapita),
            "treasury_yield" => Ok(Self::TreasuryYield),
            "federal_funds_rate" => Ok(Self::FederalFundsRate),
            "cpi" => Ok(Self::Cpi),
            "inflation" => Ok(Self::Inflation),
            "retail_sales" => Ok(Self::RetailSales),
            "durables" => Ok(Self::Durables),
            "unemployment" => Ok(Self::Unemployment),
            "nonfarm_payroll" => Ok(Self::NonfarmPayroll),
            other => Err(DataError::InvalidParameter(format!(
                "unknown indicator '{other}', expected one of: {}",
                Self::ALL_KEYS.join(", ")
            ))),
        }
    }

    /// The snake_case key used in tool calls and stored in `data_feeds`.
    pub fn key(self) -> &'static str {
        match self {
            Self::RealGdp => "real_gdp",
            Self::RealGdpPerCapita => "real_gdp_per_capita",
            Self::TreasuryYield => "treasury_yield",
            Self::FederalFundsRate => "federal_funds_rate",
            Self::Cpi => "cpi",
            Self::Inflation => "inflation",
            Self::RetailSales => "retail_sales",
            Self::Durables => "durables",
            Self::Unemployment => "unemployment",
            Self::NonfarmPayroll => "nonfarm_payroll",
        }
    }

    /// The upstream `function` query parameter.
    pub fn function(self) -> &'static str {
        match self {
            Self::RealGdp => "REAL_GDP",
            Self::RealGdpPerCapita => "REAL_GDP_PER_CAPITA",
            Self::TreasuryYield => "TREASURY_YIELD",
            Self::FederalFundsRate => "FEDERAL_FUNDS_RATE",
            Self::Cpi => "CPI",
            Self::Inflation => "INFLATION",
            Self::RetailSales => "RETAIL_SALES",
            Self::Durables => "DURABLES",
            Self::Unemployment => "UNEMPLOYMENT",
            Self::NonfarmPayroll => "NONFARM_PAYROLL",
        }
    }

    /// Intervals the endpoint accepts. Empty when the endpoint has a fixed
    /// reporting cadence and takes no interval at all.
    pub fn allowed_intervals(self) -> &'static [&'static str] {
        match self {
            Self::RealGdp => &["quarterly", "annual"],
            Self::TreasuryYield | Self::FederalFundsRate => &["daily", "weekly", "monthly"],
            Self::Cpi => &["monthly", "semiannual"],
            Self::RealGdpPerCapita
            | Self::Inflation
            | Self::RetailSales
            | Self::Durables
            | Self::Unemployment
            | Self::NonfarmPayroll => &[],
        }
    }

    pub fn supports_maturity(self) -> bool {
        matches!(self, Self::TreasuryYield)
    }

    /// Checks an interval/maturity combination against the endpoint.
    /// Unsupported parameters are rejected rather than silently dropped.
    pub fn validate_params(self, interval: Option<&str>, maturity: Option<&str>) -> Result<()> {
        if let Some(interval) = interval {
            let allowed = self.allowed_intervals();
            if allowed.is_empty() {
                return Err(DataError::InvalidParameter(format!(
                    "indicator '{}' has a fixed cadence and takes no interval",
                    self.key()
                )));
            }
            if !allowed.contains(&interval) {
                return Err(DataError::InvalidParameter(format!(
                    "invalid interval '{interval}' for '{}', allowed: {}",
                    self.key(),
                    allowed.join(", ")
                )));
            }
        }
        if let Some(maturity) = maturity {
            if !self.supports_maturity() {
                return Err(DataError::InvalidParameter(format!(
                    "maturity only applies to treasury_yield, not '{}'",
                    self.key()
                )));
            }
            if !Self::TREASURY_MATURITIES.contains(&maturity) {
                return Err(DataError::InvalidParameter(format!(
                    "invalid maturity '{maturity}', allowed: {}",
                    Self::TREASURY_MATURITIES.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Commodities served by the Alpha Vantage commodity endpoints. All of them
/// accept monthly, quarterly, and annual intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commodity {
    Wti,
    Brent,
    NaturalGas,
    Copper,
    Aluminum,
    Wheat,
    Corn,
    Cotton,
    Sugar,
    Coffee,
    AllCommodities,
}

impl Commodity {
    pub const ALL_KEYS: &'static [&'static str] = &[
        "wti",
        "brent",
        "natural_gas",
        "copper",
        "aluminum",
        "wheat",
        "corn",
        "cotton",
        "sugar",
        "coffee",
        "all_commodities_index",
    ];

    pub const ALLOWED_INTERVALS: &'static [&'static str] = &["monthly", "quarterly", "annual"];

    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "wti" => Ok(Self::Wti),
            "brent" => Ok(Self::Brent),
            "natural_gas" => Ok(Self::NaturalGas),
            "copper" => Ok(Self::Copper),
            "aluminum" => Ok(Self::Aluminum),
            "wheat" => Ok(Self::Wheat),
            "corn" => Ok(Self::Corn),
            "cotton" => Ok(Self::Cotton),
            "sugar" => Ok(Self::Sugar),
            "coffee" => Ok(Self::Coffee),
            "all_commodities_index" => Ok(Self::AllCommodities),
            other => Err(DataError::InvalidParameter(format!(
                "unknown commodity '{other}', expected one of: {}",
                Self::ALL_KEYS.join(", ")
            ))),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Wti => "wti",
            Self::Brent => "brent",
            Self::NaturalGas => "natural_gas",
            Self::Copper => "copper",
            Self::Aluminum => "aluminum",
            Self::Wheat => "wheat",
            Self::Corn => "corn",
            Self::Cotton => "cotton",
            Self::Sugar => "sugar",
            Self::Coffee => "coffee",
            Self::AllCommodities => "all_commodities_index",
        }
    }

    pub fn function(self) -> &'static str {
        match self {
            Self::Wti => "WTI",
            Self::Brent => "BRENT",
            Self::NaturalGas => "NATURAL_GAS",
            Self::Copper => "COPPER",
            Self::Aluminum => "ALUMINUM",
            Self::Wheat => "WHEAT",
            Self::Corn => "CORN",
            Self::Cotton => "COTTON",
            Self::Sugar => "SUGAR",
            Self::Coffee => "COFFEE",
            Self::AllCommodities => "ALL_COMMODITIES",
        }
    }

    pub fn validate_interval(interval: &str) -> Result<()> {
        if Self::ALLOWED_INTERVALS.contains(&interval) {
            Ok(())
        } else {
            Err(DataError::InvalidParameter(format!(
                "invalid interval '{interval}', allowed: {}",
                Self::ALLOWED_INTERVALS.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_keys_round_trip() {
        for key in EconIndicator::ALL_KEYS {
            assert_eq!(EconIndicator::from_key(key).unwrap().key(), *key);
        }
        assert!(EconIndicator::from_key("gdp").is_err());
    }

    #[test]
    fn treasury_yield_accepts_maturity() {
        let indicator = EconIndicator::TreasuryYield;
        assert!(indicator.validate_params(Some("daily"), Some("10year")).is_ok());
        assert!(indicator.validate_params(None, Some("10year")).is_ok());
        assert!(indicator.validate_params(Some("daily"), Some("1year")).is_err());
    }

    #[test]
    fn maturity_rejected_for_other_indicators() {
        let err = EconIndicator::Cpi
            .validate_params(None, Some("10year"))
            .unwrap_err();
        assert!(err.to_string().contains("treasury_yield"));
    }

    #[test]
    fn fixed_cadence_indicators_take_no_interval() {
        assert!(EconIndicator::Inflation.validate_params(None, None).is_ok());
        assert!(EconIndicator::Inflation
            .validate_params(Some("monthly"), None)
            .is_err());
    }

    #[test]
    fn cpi_intervals() {
        assert!(EconIndicator::Cpi.validate_params(Some("semiannual"), None).is_ok());
        assert!(EconIndicator::Cpi.validate_params(Some("daily"), None).is_err());
    }

    #[test]
    fn commodity_keys_round_trip() {
        for key in Commodity::ALL_KEYS {
            assert_eq!(Commodity::from_key(key).unwrap().key(), *key);
        }
        assert!(Commodity::from_key("gold").is_err());
    }

    #[test]
    fn aggregate_index_key_maps_to_upstream_function() {
        let commodity = Commodity::from_key("all_commodities_index").unwrap();
        assert_eq!(commodity.function(), "ALL_COMMODITIES");
        assert!(Commodity::from_key("all_commodities").is_err());
    }

    #[test]
    fn commodity_interval_validation() {
        assert!(Commodity::validate_interval("quarterly").is_ok());
        assert!(Commodity::validate_interval("daily").is_err());
    }
}
