//! Template-facing views over a detailed report

use crate::config::AnalysisType;
use crate::engine::{Status, SymbolResult};
use crate::persist::DetailedReport;
use crate::tools::Payload;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Field {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub time: String,
    pub source: String,
    pub summary: String,
    pub url: String,
}

/// One analysis type of one symbol
#[derive(Debug, Serialize)]
pub struct Section {
    pub title: String,
    pub fields: Vec<Field>,
    pub news: Vec<NewsItem>,
    pub ai_report: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SymbolView {
    pub symbol: String,
    pub name: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub error_message: Option<String>,
    pub analysis_time: String,
    pub current_price: f64,
    pub change_percent: f64,
    pub industry: String,
    pub technical_trend: String,
    pub rsi_level: &'static str,
    pub news_count: u64,
    pub profit_ratio: f64,
    pub analysis_count: usize,
    pub has_ai_analysis: bool,
    pub sections: Vec<Section>,
}

#[derive(Debug, Serialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchView {
    pub start_time: String,
    pub end_time: String,
    pub total_duration: f64,
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub success_rate: f64,
    pub ai_analysis_coverage: f64,
    pub analysis_types: Vec<&'static str>,
    pub worker_count: usize,
    pub include_ai_analysis: bool,
    pub industries: Vec<Bucket>,
    pub price_ranges: Vec<Bucket>,
    pub trends: Vec<Bucket>,
    pub results: Vec<SymbolView>,
}

pub fn status_label(status: Status) -> &'static str {
    match status {
        Status::Success => "成功",
        Status::Partial => "部分成功",
        Status::Failed => "失败",
    }
}

fn field_label(key: &str) -> &str {
    match key {
        "current_price" => "当前价格",
        "previous_close" => "昨收",
        "change" => "涨跌额",
        "change_percent" => "涨跌幅(%)",
        "open" => "开盘",
        "high" => "最高",
        "low" => "最低",
        "volume" => "成交量",
        "period_high" => "区间最高",
        "period_low" => "区间最低",
        "industry" => "行业",
        "ma5" | "ma10" | "ma20" | "ma60" | "ema12" | "ema26" => key,
        "macd_dif" => "MACD DIF",
        "macd_dea" => "MACD DEA",
        "macd_histogram" => "MACD 柱",
        "rsi_14" => "RSI(14)",
        "boll_upper" => "布林上轨",
        "boll_middle" => "布林中轨",
        "boll_lower" => "布林下轨",
        "ma_trend" => "均线趋势",
        "macd_trend" => "MACD趋势",
        "annual_volatility" => "年化波动率(%)",
        "max_drawdown" => "最大回撤(%)",
        "profit_ratio" => "获利比例(%)",
        "avg_cost" => "平均成本",
        "support_level" => "支撑位",
        "resistance_level" => "阻力位",
        "news_count" => "新闻数量",
        _ => key,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Scalar fields, flattening one level of nesting (`indicators`, `cost_90`, ...)
fn collect_fields(map: &serde_json::Map<String, Value>, prefix: &str, out: &mut Vec<Field>) {
    for (key, value) in map {
        match value {
            Value::Object(inner) if prefix.is_empty() && key != "ai_analysis" && key != "analysis_info" => {
                collect_fields(inner, key, out);
            }
            Value::Object(_) | Value::Array(_) => {}
            scalar => {
                let label = if prefix.starts_with("cost_") {
                    format!("{prefix} {key}")
                } else {
                    field_label(key).to_string()
                };
                out.push(Field {
                    label,
                    value: display(scalar),
                });
            }
        }
    }
}

fn section(kind: AnalysisType, payload: &Payload) -> Section {
    let title = kind.label().to_string();
    let Some(map) = payload.fields() else {
        return Section {
            title,
            fields: Vec::new(),
            news: Vec::new(),
            ai_report: None,
            error: payload.error().map(ToString::to_string),
        };
    };

    let mut fields = Vec::new();
    if kind != AnalysisType::Comprehensive {
        collect_fields(map, "", &mut fields);
    }
    let news = map
        .get("news_data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|n| NewsItem {
                    title: n["title"].as_str().unwrap_or("无标题").to_string(),
                    time: n["time"].as_str().unwrap_or_default().to_string(),
                    source: n["source"].as_str().unwrap_or_default().to_string(),
                    summary: n["summary"].as_str().unwrap_or_default().to_string(),
                    url: n["url"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    let ai_report = match kind {
        AnalysisType::Comprehensive => map.get("report"),
        _ => map.get("ai_analysis").and_then(|ai| ai.get("report")),
    }
    .and_then(Value::as_str)
    .map(ToString::to_string);

    Section {
        title,
        fields,
        news,
        ai_report,
        error: None,
    }
}

impl From<&SymbolResult> for SymbolView {
    fn from(result: &SymbolResult) -> Self {
        let summary = &result.summary;
        Self {
            symbol: result.symbol.clone(),
            name: result.name.clone(),
            status: result.status.as_str(),
            status_label: status_label(result.status),
            error_message: result.error_message.clone(),
            analysis_time: result.analysis_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            current_price: summary.current_price,
            change_percent: summary.change_percent,
            industry: summary.industry.clone(),
            technical_trend: summary.technical_trend.clone(),
            rsi_level: summary.rsi_level.label(),
            news_count: summary.news_count,
            profit_ratio: summary.profit_ratio,
            analysis_count: summary.analysis_count,
            has_ai_analysis: summary.has_ai_analysis,
            sections: result
                .analysis_data
                .iter()
                .map(|(kind, payload)| section(*kind, payload))
                .collect(),
        }
    }
}

fn buckets<'a>(entries: impl Iterator<Item = (&'a String, &'a usize)>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = entries
        .map(|(label, count)| Bucket {
            label: label.clone(),
            count: *count,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets
}

impl From<&DetailedReport> for BatchView {
    fn from(report: &DetailedReport) -> Self {
        let info = &report.batch_info;
        let stats = &report.summary_stats;
        let ranges = stats.price_ranges;
        Self {
            start_time: info.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            end_time: info.end_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            total_duration: info.total_duration,
            total: stats.total_symbols,
            success_count: info.success_count,
            failed_count: info.failed_count,
            success_rate: stats.success_rate,
            ai_analysis_coverage: stats.ai_analysis_coverage,
            analysis_types: info.config.analysis_types.iter().map(|t| t.label()).collect(),
            worker_count: info.config.worker_count,
            include_ai_analysis: info.config.include_ai_analysis,
            industries: buckets(stats.industry_distribution.iter()),
            price_ranges: vec![
                Bucket {
                    label: "低价股 (<20元)".to_string(),
                    count: ranges.low,
                },
                Bucket {
                    label: "中价股 (20-100元)".to_string(),
                    count: ranges.medium,
                },
                Bucket {
                    label: "高价股 (>=100元)".to_string(),
                    count: ranges.high,
                },
            ],
            trends: buckets(stats.trend_distribution.iter()),
            results: report.results.iter().map(SymbolView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_flattens_indicators() {
        let payload = Payload::from_value(json!({
            "indicators": {"rsi_14": 55.5, "ma_trend": "bullish"},
            "cost_90": {"low": 10.0, "high": 12.0},
            "ai_analysis": {"report": "趋势向好"},
            "data_points": 120,
        }));
        let section = section(AnalysisType::Technical, &payload);

        let labels: Vec<&str> = section.fields.iter().map(|f| f.label.as_str()).collect();
        assert!(labels.contains(&"RSI(14)"));
        assert!(labels.contains(&"均线趋势"));
        assert!(labels.contains(&"cost_90 low"));
        assert_eq!(section.ai_report.as_deref(), Some("趋势向好"));
    }

    #[test]
    fn test_failed_section_keeps_error() {
        let section = section(AnalysisType::News, &Payload::failed("FINNHUB_API_KEY not configured"));
        assert!(section.fields.is_empty());
        assert_eq!(section.error.as_deref(), Some("FINNHUB_API_KEY not configured"));
    }

    #[test]
    fn test_comprehensive_section_uses_report() {
        let payload = Payload::from_value(json!({"report": "# 结论", "analysis_info": {"data_sources_count": 2}}));
        let section = section(AnalysisType::Comprehensive, &payload);
        assert!(section.fields.is_empty());
        assert_eq!(section.ai_report.as_deref(), Some("# 结论"));
    }
}
