//! Prompt templates for narrative generation
//!
//! Rendered with MiniJinja. Only data present in the review context reaches
//! the prompt; missing figures are spelled out as not available.

use super::ReviewContext;
use crate::analysis::Distribution;
use crate::error::{Result, ReviewError};
use crate::locale::Language;
use minijinja::Environment;
use serde::Serialize;

const DESCRIPTION_LIMIT: usize = 500;

const SYSTEM_HE: &str = "אתה כותב פיננסי מומחה המתמחה בסקירות מניות בעברית עבור אתר msl.org.il. \
הקהל שלך הוא משקיעים מתחילים עד בינוניים בישראל. אתה תמיד מחזיר JSON תקני בלבד.";

const SYSTEM_EN: &str = "You are an expert financial writer producing stock reviews in English \
for beginner and intermediate investors. You always answer with valid JSON only.";

const USER_HE: &str = r#"נתוני המניה:
- חברה: {{ company_name }}
- סימול: {{ symbol }}
- מחיר נוכחי: {{ price }}
- שינוי יומי: {{ day_change }}
- דירוג אנליסטים: {{ label }} ({{ score }}/5)
- מספר אנליסטים: {{ analysts_count }}
- מחיר יעד קונצנזוס: {{ target_consensus }}
- מחיר יעד גבוה: {{ target_high }}
- מחיר יעד נמוך: {{ target_low }}
{% if weburl %}- אתר: {{ weburl }}
{% endif %}{% if industry %}- תעשייה: {{ industry }}
{% endif %}{% if country %}- מדינה: {{ country }}
{% endif %}{% if market_cap %}- שווי שוק: ${{ market_cap }} מיליון
{% endif %}{% if description %}- תיאור החברה: {{ description }}
{% endif %}{% if distribution %}
התפלגות המלצות אנליסטים:
- Strong Buy: {{ distribution.strongBuy }}
- Buy: {{ distribution.buy }}
- Hold: {{ distribution.hold }}
- Sell: {{ distribution.sell }}
- Strong Sell: {{ distribution.strongSell }}
{% endif %}
כתוב סקירה מקיפה ואיכותית על {{ company_name }} ({{ symbol }}).

חשוב מאוד:
1. כתוב רק בעברית תקנית
2. השתמש אך ורק בנתונים שסופקו למעלה - אל תמציא מספרים או עובדות
3. אם אין לך מידע ספציפי, כתוב באופן כללי יותר
4. טון מקצועי ואינפורמטיבי, לא שיווקי
5. ללא המלצות קנייה/מכירה מפורשות
6. כל סקשן בפורמט HTML תקני

החזר JSON בפורמט הבא (ללא טקסט נוסף):
{"sections": [
  {"id": "tl_dr", "title": "בקצרה: מה מצב החברה?", "html": "<p>סיכום של 4-5 משפטים</p>"},
  {"id": "business_model", "title": "מה החברה עושה ואיך היא מרוויחה כסף?", "html": "<p>5-7 משפטים</p>"},
  {"id": "latest_report", "title": "נקודות עיקריות מהדוח האחרון", "html": "<ul><li>נקודה</li></ul>"},
  {"id": "analysts_view", "title": "מה חושבים האנליסטים?", "html": "<p>4-5 משפטים</p>"},
  {"id": "risks", "title": "סיכונים עיקריים", "html": "<ul><li>סיכון עם הסבר</li></ul>"},
  {"id": "who_fits", "title": "למי המניה עשויה להתאים? (לא המלצה)", "html": "<ul><li>פרופיל משקיע</li></ul>"}
]}"#;

const USER_EN: &str = r#"Stock data:
- Company: {{ company_name }}
- Symbol: {{ symbol }}
- Current price: {{ price }}
- Daily change: {{ day_change }}
- Analyst rating: {{ label }} ({{ score }}/5)
- Number of analysts: {{ analysts_count }}
- Consensus price target: {{ target_consensus }}
- High price target: {{ target_high }}
- Low price target: {{ target_low }}
{% if weburl %}- Website: {{ weburl }}
{% endif %}{% if industry %}- Industry: {{ industry }}
{% endif %}{% if country %}- Country: {{ country }}
{% endif %}{% if market_cap %}- Market cap: ${{ market_cap }} million
{% endif %}{% if description %}- Company description: {{ description }}
{% endif %}{% if distribution %}
Analyst recommendation breakdown:
- Strong Buy: {{ distribution.strongBuy }}
- Buy: {{ distribution.buy }}
- Hold: {{ distribution.hold }}
- Sell: {{ distribution.sell }}
- Strong Sell: {{ distribution.strongSell }}
{% endif %}
Write a thorough, high-quality review of {{ company_name }} ({{ symbol }}).

Rules:
1. Write in plain English
2. Use only the data supplied above; never invent figures or facts
3. Without specific information, stay general
4. Professional, informative tone, not promotional
5. No explicit buy or sell recommendations
6. Every section must be valid HTML

Return JSON in this format (no other text):
{"sections": [
  {"id": "tl_dr", "title": "In short: where does the company stand?", "html": "<p>4-5 sentence summary</p>"},
  {"id": "business_model", "title": "What does the company do and how does it make money?", "html": "<p>5-7 sentences</p>"},
  {"id": "latest_report", "title": "Highlights from the latest report", "html": "<ul><li>point</li></ul>"},
  {"id": "analysts_view", "title": "What do analysts think?", "html": "<p>4-5 sentences</p>"},
  {"id": "risks", "title": "Key risks", "html": "<ul><li>risk with explanation</li></ul>"},
  {"id": "who_fits", "title": "Who might this stock suit? (not a recommendation)", "html": "<ul><li>investor profile</li></ul>"}
]}"#;

/// Values interpolated into the user prompt
#[derive(Debug, Serialize)]
struct PromptVars<'a> {
    symbol: &'a str,
    company_name: &'a str,
    price: String,
    day_change: String,
    label: &'a str,
    score: String,
    analysts_count: u32,
    target_consensus: String,
    target_high: String,
    target_low: String,
    weburl: Option<&'a str>,
    industry: Option<&'a str>,
    country: Option<&'a str>,
    market_cap: Option<String>,
    description: Option<String>,
    distribution: Option<Distribution>,
}

impl<'a> PromptVars<'a> {
    fn from_context(ctx: &'a ReviewContext<'a>) -> Self {
        let na = ctx.lang.not_available();
        let money = |value: Option<f64>| value.map_or_else(|| na.to_string(), |v| format!("${v:.2}"));
        let present = |value: &'a Option<String>| {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        };

        let price = (ctx.kpi.price > 0.0).then_some(ctx.kpi.price);
        let targets = &ctx.consensus.targets;
        let distribution = ctx.consensus.distribution;

        Self {
            symbol: ctx.symbol,
            company_name: ctx.company_name,
            price: money(price),
            day_change: ctx
                .kpi
                .day_change_pct
                .map_or_else(|| na.to_string(), |v| format!("{v:.2}%")),
            label: ctx.consensus.label.map_or(na, |l| l.text(ctx.lang)),
            score: ctx
                .consensus
                .score
                .map_or_else(|| na.to_string(), |s| s.to_string()),
            analysts_count: ctx.consensus.analysts_count,
            target_consensus: money(targets.consensus),
            target_high: money(targets.high),
            target_low: money(targets.low),
            weburl: present(&ctx.profile.weburl),
            industry: present(&ctx.profile.finnhub_industry),
            country: present(&ctx.profile.country),
            market_cap: ctx
                .profile
                .market_capitalization
                .filter(|cap| *cap > 0.0)
                .map(|cap| format!("{cap:.0}")),
            description: present(&ctx.profile.description)
                .map(|d| d.chars().take(DESCRIPTION_LIMIT).collect()),
            distribution: (distribution.total() > 0).then_some(distribution),
        }
    }
}

/// System prompt for the requested language
pub fn system_prompt(lang: Language) -> &'static str {
    match lang {
        Language::Hebrew => SYSTEM_HE,
        Language::English => SYSTEM_EN,
    }
}

/// Render the section-generation prompt
pub fn sections_prompt(ctx: &ReviewContext<'_>) -> Result<String> {
    let template = match ctx.lang {
        Language::Hebrew => USER_HE,
        Language::English => USER_EN,
    };

    let env = Environment::new();
    let vars = minijinja::Value::from_serialize(PromptVars::from_context(ctx));

    env.render_str(template, vars)
        .map_err(|e| ReviewError::Internal(format!("Failed to render prompt: {e}")))
}
