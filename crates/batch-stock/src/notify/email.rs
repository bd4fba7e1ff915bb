//! SMTP delivery of batch reports

use crate::engine::Status;
use crate::error::{BatchError, Result};
use crate::persist::DetailedReport;
use crate::report::{ReportFormat, render_summary};
use batch_utils::{Settings, SmtpSettings, SmtpTls};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl EmailNotifier {
    pub fn new(smtp: &SmtpSettings) -> Result<Self> {
        let from: Mailbox = smtp
            .from
            .parse()
            .map_err(|e| BatchError::Email(format!("Invalid from address {}: {e}", smtp.from)))?;
        let to = smtp
            .to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| BatchError::Email(format!("Invalid recipient {addr}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        if to.is_empty() {
            return Err(BatchError::Email("no recipients configured".to_string()));
        }

        let mut builder = match smtp.tls {
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host),
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host),
            SmtpTls::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)),
        }
        .map_err(|e| BatchError::Email(format!("SMTP transport error: {e}")))?
        .port(smtp.port);

        if !smtp.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    /// `None` when email delivery is not configured
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        settings.smtp.as_ref().map(Self::new).transpose()
    }

    /// Build the report message: HTML and plain-text alternatives plus attachments
    pub fn compose(&self, report: &DetailedReport, attachments: &[PathBuf]) -> Result<Message> {
        let html = render_summary(report, ReportFormat::Html)?;
        let body = MultiPart::alternative_plain_html(plain_summary(report), html);

        let mut builder = Message::builder().from(self.from.clone()).subject(subject(report));
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let message = if attachments.is_empty() {
            builder.multipart(body)
        } else {
            let mut mixed = MultiPart::mixed().multipart(body);
            for path in attachments {
                mixed = mixed.singlepart(attachment(path)?);
            }
            builder.multipart(mixed)
        };
        message.map_err(|e| BatchError::Email(format!("Failed to build email: {e}")))
    }

    pub async fn send_report(&self, report: &DetailedReport, attachments: &[PathBuf]) -> Result<()> {
        let message = self.compose(report, attachments)?;
        match self.transport.send(message).await {
            Ok(_) => {
                info!(
                    "Report email sent to {} recipient(s) with {} attachment(s)",
                    self.to.len(),
                    attachments.len()
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to send report email: {e}");
                Err(BatchError::Email(format!("Failed to send email: {e}")))
            }
        }
    }
}

pub fn subject(report: &DetailedReport) -> String {
    let info = &report.batch_info;
    format!(
        "批量股票分析报告 {} (成功 {}/{})",
        info.end_time.format("%Y-%m-%d %H:%M"),
        info.success_count,
        info.success_count + info.failed_count
    )
}

/// Plain-text fallback body
pub fn plain_summary(report: &DetailedReport) -> String {
    let info = &report.batch_info;
    let stats = &report.summary_stats;
    let mut text = format!(
        "批量股票分析完成\n\n分析股票数: {}\n成功: {}\n失败: {}\n成功率: {:.1}%\n总耗时: {:.2} 秒\n",
        stats.total_symbols, info.success_count, info.failed_count, stats.success_rate, info.total_duration
    );

    let successful: Vec<_> = report.results.iter().filter(|r| r.status != Status::Failed).collect();
    if !successful.is_empty() {
        text.push_str("\n成功股票:\n");
        for r in successful {
            text.push_str(&format!(
                "  {} {}: 价格 {:.2}, 涨跌幅 {:.2}%, 行业 {}\n",
                r.symbol, r.name, r.summary.current_price, r.summary.change_percent, r.summary.industry
            ));
        }
    }

    let failed: Vec<_> = report.results.iter().filter(|r| r.status == Status::Failed).collect();
    if !failed.is_empty() {
        text.push_str("\n失败股票:\n");
        for r in failed {
            text.push_str(&format!(
                "  {} {}: {}\n",
                r.symbol,
                r.name,
                r.error_message.as_deref().unwrap_or("未知错误")
            ));
        }
    }
    text
}

fn content_type(path: &Path) -> ContentType {
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("md") => "text/markdown; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    };
    ContentType::parse(mime).unwrap_or(ContentType::TEXT_PLAIN)
}

fn attachment(path: &Path) -> Result<SinglePart> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BatchError::Email(format!("Invalid attachment path: {}", path.display())))?
        .to_string();
    let bytes = fs::read(path)
        .map_err(|e| BatchError::Email(format!("Failed to read attachment {}: {e}", path.display())))?;
    Ok(Attachment::new(name).body(bytes, content_type(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::engine::{SummaryStats, SymbolResult};
    use crate::persist::BatchInfo;
    use chrono::Local;
    use tempfile::TempDir;

    fn smtp() -> SmtpSettings {
        SmtpSettings {
            host: "localhost".to_string(),
            port: 2525,
            username: String::new(),
            password: String::new(),
            from: "batch@example.com".to_string(),
            to: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            tls: SmtpTls::None,
        }
    }

    fn report() -> DetailedReport {
        let mut ok = SymbolResult::failed("600519", "贵州茅台", "");
        ok.status = Status::Success;
        ok.error_message = None;
        ok.summary.current_price = 1700.0;
        ok.summary.industry = "白酒".to_string();
        let failed = SymbolResult::failed("999999", "未知", "无法获取股票 999999 的身份信息");
        let results = vec![ok, failed];
        let now = Local::now();
        DetailedReport {
            batch_info: BatchInfo {
                start_time: now,
                end_time: now,
                total_duration: 2.0,
                success_count: 1,
                failed_count: 1,
                config: BatchConfig::builder().symbols(["600519", "999999"]).build().unwrap(),
            },
            summary_stats: SummaryStats::from_results(&results),
            results,
        }
    }

    #[test]
    fn test_invalid_addresses_are_rejected() {
        let mut bad_from = smtp();
        bad_from.from = "not an address".to_string();
        assert!(matches!(EmailNotifier::new(&bad_from), Err(BatchError::Email(_))));

        let mut no_recipients = smtp();
        no_recipients.to.clear();
        assert!(EmailNotifier::new(&no_recipients).is_err());
    }

    #[test]
    fn test_from_settings_without_smtp() {
        assert!(EmailNotifier::from_settings(&Settings::default()).unwrap().is_none());
    }

    #[test]
    fn test_plain_summary_lists_symbols() {
        let text = plain_summary(&report());
        assert!(text.contains("成功: 1"));
        assert!(text.contains("600519 贵州茅台: 价格 1700.00"));
        assert!(text.contains("999999 未知: 无法获取股票 999999 的身份信息"));
    }

    #[test]
    fn test_compose_with_attachment() {
        let temp = TempDir::new().unwrap();
        let csv = temp.path().join("batch_analysis_summary_x.csv");
        fs::write(&csv, "symbol\n600519\n").unwrap();

        let notifier = EmailNotifier::new(&smtp()).unwrap();
        let message = notifier.compose(&report(), &[csv]).unwrap();

        assert_eq!(message.envelope().to().len(), 2);
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("batch_analysis_summary_x.csv"));
    }

    #[test]
    fn test_missing_attachment_is_an_email_error() {
        let notifier = EmailNotifier::new(&smtp()).unwrap();
        let err = notifier
            .compose(&report(), &[PathBuf::from("/no/such/report.md")])
            .unwrap_err();
        assert!(matches!(err, BatchError::Email(_)));
    }
}
