//! User message templates for AI analysis

use crate::config::AnalysisType;

pub const BASIC_USER: &str = "请分析 {{ name }}（{{ code }}）的最新行情：

{{ data }}";

pub const TECHNICAL_USER: &str = "请根据以下技术指标分析 {{ name }}（{{ code }}）的走势：

{{ data }}";

pub const NEWS_USER: &str = "以下是 {{ name }}（{{ code }}）的近期新闻，请分析其影响：

{{ data }}";

pub const CHIP_USER: &str = "请根据以下筹码分布数据分析 {{ name }}（{{ code }}）：

{{ data }}";

pub const COMPREHENSIVE_USER: &str = "请对 {{ name }}（{{ code }}）进行综合分析。

{% if opinion %}用户观点：{{ opinion }}
{% endif %}用户持仓：{{ position }}
{% for section in sections %}
## {{ section.title }}
{{ section.data }}
{% endfor %}";

/// User template for a data dimension
pub fn user_template(kind: AnalysisType) -> &'static str {
    match kind {
        AnalysisType::Basic => BASIC_USER,
        AnalysisType::Technical => TECHNICAL_USER,
        AnalysisType::News => NEWS_USER,
        AnalysisType::Chip => CHIP_USER,
        AnalysisType::Comprehensive => COMPREHENSIVE_USER,
    }
}
