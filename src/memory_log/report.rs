//! 内存日志报表渲染
//!
//! 无副作用，调用方负责在渲染前完成权限校验。
//! 行号（display index）只在单次渲染内有效，不是记录的持久标识。

use serde::Serialize;

use crate::common::{escape_html, truncate_with_ellipsis};

use super::model::{LogRecord, Severity};

/// 表格中 URI 的最大显示长度，完整值见详情面板
const URI_DISPLAY_CHARS: usize = 80;

/// 报表视图模型
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub total: usize,
    pub rows: Vec<ReportRow>,
    /// 详情面板数据，下标与 `rows[i].index` 对应
    pub detail: Vec<LogRecord>,
}

/// 表格行
///
/// 字符串字段已做 HTML 转义，仅用于页面显示；原始值见 [`ReportView::detail`]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub index: usize,
    pub severity: Severity,
    pub timestamp: String,
    pub uri: String,
    pub user: String,
    pub method: String,
    pub memory_usage_mb: String,
    pub peak_memory_mb: String,
    pub memory_limit: String,
    pub memory_percent: String,
    pub plugin_count: usize,
    pub is_async: bool,
    pub referrer: String,
    pub warning: String,
}

/// 构建报表视图，每次调用都重新计算严重程度
pub fn render(records: Vec<LogRecord>) -> ReportView {
    let rows = records
        .iter()
        .enumerate()
        .map(|(index, record)| ReportRow {
            index,
            severity: record.severity(),
            timestamp: escape_html(&record.timestamp),
            uri: escape_html(&truncate_with_ellipsis(&record.uri, URI_DISPLAY_CHARS)),
            user: escape_html(&record.user),
            method: escape_html(&record.method),
            memory_usage_mb: format!("{:.2}", record.memory_usage_mb),
            peak_memory_mb: format!("{:.2}", record.peak_memory_mb),
            memory_limit: escape_html(&record.memory_limit),
            memory_percent: format!("{:.2}", record.memory_percent),
            plugin_count: record.active_plugins.len(),
            is_async: record.is_async,
            referrer: escape_html(&record.referrer),
            warning: escape_html(&record.warning),
        })
        .collect();

    ReportView {
        total: records.len(),
        rows,
        detail: records,
    }
}

/// 页面上下文
#[derive(Debug)]
pub struct PageContext<'a> {
    /// 路由挂载路径，如 `/admin/memory-log`
    pub base_path: &'a str,
    /// 清空操作的一次性 token
    pub clear_nonce: &'a str,
    /// 是否显示清空成功提示
    pub cleared: bool,
}

/// 渲染管理页面 HTML
pub fn render_page(view: &ReportView, ctx: &PageContext<'_>) -> String {
    let base = escape_html(ctx.base_path);
    let mut html = String::with_capacity(4096 + view.rows.len() * 512);

    html.push_str(PAGE_HEAD);
    html.push_str("<h1>Debug Memory Log</h1>\n");

    if ctx.cleared {
        html.push_str("<div class=\"notice notice-success\"><p>Memory log cleared.</p></div>\n");
    }

    html.push_str(&format!(
        "<div class=\"actions\">\
         <span class=\"total\">Total entries: {total}</span> \
         <a class=\"button\" href=\"{base}/export\">Export JSON</a> \
         <form method=\"post\" action=\"{base}/clear\" \
         onsubmit=\"return confirm('Clear all memory log entries?');\">\
         <input type=\"hidden\" name=\"nonce\" value=\"{nonce}\">\
         <button type=\"submit\" class=\"button\">Clear Log</button></form></div>\n",
        total = view.total,
        base = base,
        nonce = escape_html(ctx.clear_nonce),
    ));

    if view.rows.is_empty() {
        html.push_str("<p class=\"empty\">No entries recorded yet.</p>\n");
    } else {
        html.push_str(
            "<table class=\"memory-log\">\n<thead><tr>\
             <th>#</th><th>Time</th><th>URI</th><th>User</th><th>Method</th>\
             <th>Usage (MB)</th><th>Peak (MB)</th><th>Limit</th><th>%</th>\
             <th>Plugins</th><th>Warning</th></tr></thead>\n<tbody>\n",
        );
        for row in &view.rows {
            html.push_str(&render_row(row));
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("<pre id=\"memory-detail\" class=\"detail\" hidden></pre>\n");
    html.push_str("<script id=\"memory-data\" type=\"application/json\">");
    html.push_str(&script_safe_json(&view.detail));
    html.push_str("</script>\n");
    html.push_str(PAGE_TAIL);
    html
}

fn render_row(row: &ReportRow) -> String {
    let async_badge = if row.is_async {
        " <span class=\"badge\">async</span>"
    } else {
        ""
    };
    format!(
        "<tr class=\"{class}\" data-index=\"{index}\">\
         <td>{index}</td><td>{timestamp}</td><td title=\"{referrer}\">{uri}</td>\
         <td>{user}</td><td>{method}{async_badge}</td><td>{usage}</td><td>{peak}</td>\
         <td>{limit}</td><td>{percent}</td>\
         <td><span class=\"badge\">{plugins}</span></td><td>{warning}</td></tr>\n",
        class = row.severity.css_class(),
        index = row.index,
        timestamp = row.timestamp,
        referrer = row.referrer,
        uri = row.uri,
        user = row.user,
        method = row.method,
        async_badge = async_badge,
        usage = row.memory_usage_mb,
        peak = row.peak_memory_mb,
        limit = row.memory_limit,
        percent = row.memory_percent,
        plugins = row.plugin_count,
        warning = row.warning,
    )
}

/// 序列化为可直接嵌入 `<script>` 的 JSON
fn script_safe_json(records: &[LogRecord]) -> String {
    let json = match serde_json::to_string(records) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("序列化详情数据失败: {}", e);
            return "[]".to_string();
        }
    };
    json.replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Debug Memory Log</title>
<style>
body { font-family: sans-serif; margin: 2em; }
table.memory-log { border-collapse: collapse; width: 100%; }
table.memory-log th, table.memory-log td { border: 1px solid #ddd; padding: 4px 8px; font-size: 13px; }
table.memory-log tbody tr { cursor: pointer; }
tr.memory-medium { background: #fff8e5; }
tr.memory-high { background: #fcf0f1; }
.actions { margin: 1em 0; }
.actions form { display: inline; }
.badge { background: #2271b1; color: #fff; border-radius: 8px; padding: 0 6px; font-size: 11px; }
.notice-success { border-left: 4px solid #00a32a; padding: 4px 12px; }
.detail { background: #f6f7f7; padding: 1em; white-space: pre-wrap; }
</style>
</head>
<body>
"#;

const PAGE_TAIL: &str = r#"<script>
(function () {
  var data = JSON.parse(document.getElementById('memory-data').textContent);
  var panel = document.getElementById('memory-detail');
  document.querySelectorAll('tr[data-index]').forEach(function (tr) {
    tr.addEventListener('click', function () {
      var record = data[Number(tr.dataset.index)];
      if (!record) { return; }
      panel.textContent = JSON.stringify(record, null, 2);
      panel.hidden = false;
    });
  });
})();
</script>
</body>
</html>
"#;
