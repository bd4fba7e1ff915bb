//! Report templates
//!
//! Names ending in `.html` are auto-escaped by MiniJinja.

pub const SUMMARY_MD: &str = r"# 📊 批量股票分析报告

## 📊 分析概览

- **开始时间**: {{ start_time }}
- **结束时间**: {{ end_time }}
- **总耗时**: {{ total_duration|round(2) }} 秒
- **分析股票数**: {{ total }}
- **成功**: {{ success_count }}
- **失败**: {{ failed_count }}
- **成功率**: {{ success_rate|round(1) }}%
- **AI分析覆盖率**: {{ ai_analysis_coverage|round(1) }}%

## ⚙️ 分析配置

- **分析类型**: {{ analysis_types|join('、') }}
- **并发数**: {{ worker_count }}
- **AI分析**: {{ '启用' if include_ai_analysis else '关闭' }}

## 📋 结果汇总表

| 代码 | 名称 | 状态 | 当前价格 | 涨跌幅(%) | 行业 | 技术趋势 | RSI |
|------|------|------|----------|-----------|------|----------|-----|
{% for r in results -%}
| {{ r.symbol }} | {{ r.name }} | {{ r.status_label }} | {{ r.current_price|round(2) }} | {{ r.change_percent|round(2) }} | {{ r.industry or '-' }} | {{ r.technical_trend }} | {{ r.rsi_level }} |
{% endfor %}
{% if industries %}
## 🏭 行业分布

{% for b in industries -%}
- {{ b.label }}: {{ b.count }}
{% endfor %}
{% endif %}
## 💰 价格区间分布

{% for b in price_ranges -%}
- {{ b.label }}: {{ b.count }}
{% endfor %}
{% if trends %}
## 📈 技术趋势分布

{% for b in trends -%}
- {{ b.label }}: {{ b.count }}
{% endfor %}
{% endif %}
## 🔍 详细分析结果
{% for r in results if r.status != 'failed' %}
### {{ r.name }} ({{ r.symbol }})

- 状态: {{ r.status_label }}
- 当前价格: {{ r.current_price|round(2) }} ({{ r.change_percent|round(2) }}%)
- 技术趋势: {{ r.technical_trend }} / RSI {{ r.rsi_level }}
- 新闻数量: {{ r.news_count }}
- 获利比例: {{ r.profit_ratio|round(2) }}%
- 完成分析: {{ r.analysis_count }} 项{% if r.has_ai_analysis %} (含AI分析){% endif %}
{% if r.error_message %}- 问题: {{ r.error_message }}
{% endif %}
{%- endfor %}
{% set failures = results|selectattr('status', 'eq', 'failed')|list %}
{% if failures %}
## ❌ 失败股票

{% for r in failures -%}
- {{ r.symbol }} {{ r.name }}: {{ r.error_message or '未知错误' }}
{% endfor %}
{% endif %}
---
*报告生成时间: {{ generated_at }}*
";

pub const INDIVIDUAL_MD: &str = r"# {{ r.name }} ({{ r.symbol }}) 分析报告

## 📊 分析概览

- **分析时间**: {{ r.analysis_time }}
- **状态**: {{ r.status_label }}
- **当前价格**: {{ r.current_price|round(2) }}
- **涨跌幅**: {{ r.change_percent|round(2) }}%
- **行业**: {{ r.industry or '-' }}
- **技术趋势**: {{ r.technical_trend }}
- **RSI水平**: {{ r.rsi_level }}
{% if r.error_message %}- **问题**: {{ r.error_message }}
{% endif %}
{% for s in r.sections %}
## {{ s.title }}
{% if s.error %}
> 分析失败: {{ s.error }}
{% endif %}
{%- if s.fields %}
| 指标 | 数值 |
|------|------|
{% for f in s.fields -%}
| {{ f.label }} | {{ f.value }} |
{% endfor %}
{%- endif %}
{%- if s.news %}
### 最新新闻

{% for n in s.news -%}
{{ loop.index }}. **{{ n.title }}** ({{ n.source }}, {{ n.time }})
{% if n.summary %}   {{ n.summary }}
{% endif %}
{%- endfor %}
{%- endif %}
{%- if s.ai_report %}
### 🤖 AI分析

{{ s.ai_report }}
{% endif %}
{% endfor %}
---
*报告生成时间: {{ generated_at }}*
";

pub const SUMMARY_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>批量股票分析报告</title>
<style>
body { font-family: -apple-system, "Microsoft YaHei", sans-serif; max-width: 960px; margin: 2em auto; color: #222; }
table { border-collapse: collapse; width: 100%; margin: 1em 0; }
th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }
th { background: #f4f6f8; }
.success { color: #2e7d32; } .partial { color: #ef6c00; } .failed { color: #c62828; }
</style>
</head>
<body>
<h1>📊 批量股票分析报告</h1>
<h2>分析概览</h2>
<ul>
<li>时间: {{ start_time }} ~ {{ end_time }} ({{ total_duration|round(2) }} 秒)</li>
<li>分析股票数: {{ total }}, 成功 {{ success_count }}, 失败 {{ failed_count }}</li>
<li>成功率: {{ success_rate|round(1) }}%, AI分析覆盖率: {{ ai_analysis_coverage|round(1) }}%</li>
<li>分析类型: {{ analysis_types|join('、') }}, 并发数 {{ worker_count }}</li>
</ul>
<h2>结果汇总表</h2>
<table>
<tr><th>代码</th><th>名称</th><th>状态</th><th>当前价格</th><th>涨跌幅(%)</th><th>行业</th><th>技术趋势</th><th>RSI</th></tr>
{% for r in results %}<tr>
<td>{{ r.symbol }}</td><td>{{ r.name }}</td><td class="{{ r.status }}">{{ r.status_label }}</td>
<td>{{ r.current_price|round(2) }}</td><td>{{ r.change_percent|round(2) }}</td>
<td>{{ r.industry or '-' }}</td><td>{{ r.technical_trend }}</td><td>{{ r.rsi_level }}</td>
</tr>
{% endfor %}</table>
<h2>分布</h2>
<table>
<tr><th>维度</th><th>分类</th><th>数量</th></tr>
{% for b in industries %}<tr><td>行业</td><td>{{ b.label }}</td><td>{{ b.count }}</td></tr>
{% endfor %}{% for b in price_ranges %}<tr><td>价格区间</td><td>{{ b.label }}</td><td>{{ b.count }}</td></tr>
{% endfor %}{% for b in trends %}<tr><td>技术趋势</td><td>{{ b.label }}</td><td>{{ b.count }}</td></tr>
{% endfor %}</table>
{% set failures = results|selectattr('status', 'eq', 'failed')|list %}
{% if failures %}<h2>失败股票</h2>
<ul>
{% for r in failures %}<li>{{ r.symbol }} {{ r.name }}: {{ r.error_message or '未知错误' }}</li>
{% endfor %}</ul>
{% endif %}<p><em>报告生成时间: {{ generated_at }}</em></p>
</body>
</html>
"#;

pub const INDIVIDUAL_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>{{ r.name }} ({{ r.symbol }}) 分析报告</title>
<style>
body { font-family: -apple-system, "Microsoft YaHei", sans-serif; max-width: 960px; margin: 2em auto; color: #222; }
table { border-collapse: collapse; width: 100%; margin: 1em 0; }
th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }
th { background: #f4f6f8; }
.success { color: #2e7d32; } .partial { color: #ef6c00; } .failed { color: #c62828; }
.ai { white-space: pre-wrap; background: #fafafa; border-left: 4px solid #1976d2; padding: 1em; }
</style>
</head>
<body>
<h1>{{ r.name }} ({{ r.symbol }}) 分析报告</h1>
<ul>
<li>分析时间: {{ r.analysis_time }}</li>
<li>状态: <span class="{{ r.status }}">{{ r.status_label }}</span></li>
<li>当前价格: {{ r.current_price|round(2) }} ({{ r.change_percent|round(2) }}%)</li>
<li>行业: {{ r.industry or '-' }}</li>
<li>技术趋势: {{ r.technical_trend }}, RSI {{ r.rsi_level }}</li>
{% if r.error_message %}<li class="failed">问题: {{ r.error_message }}</li>
{% endif %}</ul>
{% for s in r.sections %}<h2>{{ s.title }}</h2>
{% if s.error %}<p class="failed">分析失败: {{ s.error }}</p>
{% endif %}{% if s.fields %}<table>
<tr><th>指标</th><th>数值</th></tr>
{% for f in s.fields %}<tr><td>{{ f.label }}</td><td>{{ f.value }}</td></tr>
{% endfor %}</table>
{% endif %}{% if s.news %}<h3>最新新闻</h3>
<ol>
{% for n in s.news %}<li>{% if n.url %}<a href="{{ n.url }}">{{ n.title }}</a>{% else %}{{ n.title }}{% endif %} ({{ n.source }}, {{ n.time }})</li>
{% endfor %}</ol>
{% endif %}{% if s.ai_report %}<h3>🤖 AI分析</h3>
<div class="ai">{{ s.ai_report }}</div>
{% endif %}{% endfor %}<p><em>报告生成时间: {{ generated_at }}</em></p>
</body>
</html>
"#;

