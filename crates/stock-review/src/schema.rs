//! Result document produced for every successful review
//!
//! A [`ToolResult`] is self-describing: an entity descriptor, SEO metadata, an
//! ordered list of widgets whose `data` shape is fixed per widget type, and
//! ordered narrative sections.

use crate::analysis::{Distribution, PriceTargets};
use crate::content::Insight;
use crate::locale::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "1.0";
pub const STOCK_REVIEW_TOOL_KEY: &str = "stock_review";

/// Unified result returned by every tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub schema_version: String,
    pub tool_key: String,
    pub lang: Language,
    pub generated_at: DateTime<Utc>,
    pub entity: Entity,
    pub seo: Seo,
    pub widgets: Vec<Widget>,
    pub sections: Vec<Section>,
    pub disclaimer: String,
}

impl ToolResult {
    /// Look a widget up by id
    pub fn widget(&self, id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }
}

/// Entity being reviewed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: String,
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub exchange: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seo {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub robots: String,
}

/// Narrative content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub html: String,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            html: html.into(),
        }
    }
}

/// A UI block serialised as `{id, type, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    #[serde(flatten)]
    pub body: WidgetBody,
}

impl Widget {
    pub fn new(id: impl Into<String>, body: WidgetBody) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Serialised `type` tag
    pub fn kind(&self) -> &'static str {
        match self.body {
            WidgetBody::KpiCards(_) => "kpi_cards",
            WidgetBody::TradingviewEmbed(_) => "tradingview_embed",
            WidgetBody::AnalystCard(_) => "analyst_card",
            WidgetBody::Table(_) => "table",
            WidgetBody::Notice(_) => "notice",
            WidgetBody::InsightList(_) => "insight_list",
            WidgetBody::CtaBox(_) => "cta_box",
        }
    }
}

/// Closed set of widget types and their data shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WidgetBody {
    KpiCards(KpiData),
    TradingviewEmbed(ChartEmbed),
    AnalystCard(AnalystCardData),
    Table(TableData),
    Notice(NoticeData),
    InsightList(InsightListData),
    CtaBox(CtaBoxData),
}

/// Headline figures shown as KPI cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiData {
    pub price: f64,
    pub day_change_pct: Option<f64>,
    pub analyst_score_1_5: Option<f64>,
    pub analyst_label: Option<String>,
    pub analysts_count: u32,
    pub price_target_consensus: Option<f64>,
    pub price_target_upside_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartEmbed {
    pub tv_symbol: String,
    pub interval: String,
    pub theme: String,
    pub locale: String,
    pub autosize: bool,
    pub allow_symbol_change: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystCardData {
    pub score_1_5: Option<f64>,
    pub label: Option<String>,
    pub analysts_count: u32,
    pub targets: PriceTargets,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub title: String,
    pub unit: String,
    pub scale: String,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeData {
    pub kind: NoticeKind,
    pub html_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightListData {
    pub items: Vec<Insight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtaBoxData {
    pub html_message: String,
    pub buttons: Vec<CtaButton>,
    pub html_disclosure: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtaButton {
    pub url: String,
    pub label: String,
    pub style: ButtonStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
    Secondary,
}

/// Registry entry describing an available tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub tool_key: String,
    pub name: String,
    pub description: String,
    pub entity_type: String,
    pub pack: String,
    pub endpoint: String,
}

/// All tools this crate can render
pub fn tool_registry() -> Vec<ToolInfo> {
    vec![ToolInfo {
        tool_key: STOCK_REVIEW_TOOL_KEY.to_string(),
        name: "סקירת מניה".to_string(),
        description: "ניתוח מקיף של מניה כולל נתונים פיננסיים, המלצות אנליסטים ותובנות"
            .to_string(),
        entity_type: "stock".to_string(),
        pack: "stocks".to_string(),
        endpoint: format!("/v1/tools/{STOCK_REVIEW_TOOL_KEY}/render"),
    }]
}

/// Find a registered tool by key
pub fn find_tool(tool_key: &str) -> Option<ToolInfo> {
    tool_registry().into_iter().find(|t| t.tool_key == tool_key)
}
