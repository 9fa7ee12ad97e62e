use serde::{Deserialize, Serialize};

/// A loaded industry report: body paragraphs and top-level tables, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Trimmed, non-empty body paragraph texts.
    pub paragraphs: Vec<String>,
    /// Top-level tables.
    pub tables: Vec<Table>,
}

/// A table as rows of trimmed cell texts. Rows may differ in length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// The five fixed questions asked of every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CurrentSituation,
    FutureOutlook,
    InvestmentAdvantages,
    InvestmentDisadvantages,
    ValueUpHypothesis,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::CurrentSituation,
        Topic::FutureOutlook,
        Topic::InvestmentAdvantages,
        Topic::InvestmentDisadvantages,
        Topic::ValueUpHypothesis,
    ];

    /// Field name of this topic in the JSON response.
    pub fn key(self) -> &'static str {
        match self {
            Topic::CurrentSituation => "current_situation",
            Topic::FutureOutlook => "future_outlook",
            Topic::InvestmentAdvantages => "investment_advantages",
            Topic::InvestmentDisadvantages => "investment_disadvantages",
            Topic::ValueUpHypothesis => "value_up_hypothesis",
        }
    }

    pub fn question(self) -> &'static str {
        match self {
            Topic::CurrentSituation => "業界の現状を説明してください。",
            Topic::FutureOutlook => "業界の将来の見立てを説明してください。",
            Topic::InvestmentAdvantages => "業界への投資メリットを教えてください。",
            Topic::InvestmentDisadvantages => "業界への投資デメリットを教えてください。",
            Topic::ValueUpHypothesis => {
                "業界におけるDXによるバリューアップ仮説を説明してください。"
            }
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Summaries for all five topics plus the EV/EBITDA median multiple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryReport {
    pub current_situation: String,
    pub future_outlook: String,
    pub investment_advantages: String,
    pub investment_disadvantages: String,
    pub value_up_hypothesis: String,
    /// Verbatim multiple including its unit suffix, e.g. "8.4倍".
    pub ev_ebitda_median: String,
}
