//! Printable HTML document around the report body

use crate::error::Result;
use minijinja::{Environment, context};

const TEMPLATE_NAME: &str = "report.html";

const DOCUMENT: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<title>A股分析报告 - {{ symbol }}</title>
<style>
@page { size: A4; margin: 1.5cm; }
body {
    font-family: "Microsoft YaHei", "SimHei", "Noto Sans CJK SC", "Source Han Sans CN", sans-serif;
    line-height: 1.6;
    color: #333;
    font-size: 12pt;
    max-width: 210mm;
    margin: 0 auto;
    padding: 20mm;
    background-color: white;
    box-shadow: 0 0 10px rgba(0, 0, 0, 0.1);
}
@media print { body { box-shadow: none; padding: 0; } }
h1 { color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; margin-top: 30px; }
h2 { color: #34495e; border-left: 4px solid #3498db; padding-left: 10px; margin-top: 25px; }
h3 { color: #2c3e50; margin-top: 20px; }
p { margin: 10px 0; text-align: justify; }
table { width: 100%; border-collapse: collapse; margin: 15px 0; font-size: 11pt; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; font-weight: bold; }
tr:nth-child(even) { background-color: #f9f9f9; }
code { background-color: #f8f9fa; padding: 2px 4px; border-radius: 3px; font-family: "Courier New", monospace; font-size: 10pt; }
pre { background-color: #f8f9fa; padding: 10px; border-radius: 5px; overflow-x: auto; font-size: 10pt; }
ul, ol { margin: 10px 0; padding-left: 20px; }
li { margin: 5px 0; }
.header { text-align: center; margin-bottom: 30px; border-bottom: 3px double #3498db; padding-bottom: 20px; }
.header h1 { border-bottom: none; text-align: center; }
.symbol { color: #e74c3c; font-weight: bold; font-size: 14pt; }
.timestamp { color: #7f8c8d; font-size: 10pt; margin-top: 5px; }
.footer { margin-top: 30px; padding-top: 10px; border-top: 1px solid #ddd; font-size: 10pt; color: #7f8c8d; text-align: center; }
.print-instruction { background-color: #f8f9fa; border: 1px solid #dee2e6; border-radius: 5px; padding: 15px; margin: 20px 0; font-size: 11pt; }
@media print { .print-instruction { display: none; } }
</style>
</head>
<body>
<div class="header">
<h1>A股金融分析报告</h1>
<div class="symbol">股票代码: {{ symbol }}</div>
<div class="timestamp">生成时间: {{ generated_at }}</div>
</div>
{% if print_note %}<div class="print-instruction"><strong>打印说明：</strong>未能生成PDF文件。此HTML文件已优化打印格式，可按以下步骤保存为PDF：<ol><li>按 <kbd>Ctrl+P</kbd> 打开打印对话框</li><li>打印机选择“另存为PDF”</li><li>纸张大小设为 A4，边距设为“窄”或“无”</li><li>勾选“背景图形”选项</li><li>点击保存</li></ol></div>
{% endif %}{{ body | safe }}
<div class="footer">
<p>本报告由 A股金融分析智能体 生成</p>
<p>报告仅供参考，不构成投资建议</p>
</div>
</body>
</html>
"#;

/// Marker present in the document only when the print note is shown
pub const PRINT_NOTE_MARKER: &str = "print-instruction\"><strong>";

/// Full HTML document; `body_html` is inserted unescaped
pub fn render_document(
    symbol: &str,
    generated_at: &str,
    body_html: &str,
    print_note: bool,
) -> Result<String> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, DOCUMENT)?;
    let template = env.get_template(TEMPLATE_NAME)?;
    Ok(template.render(context! {
        symbol,
        generated_at,
        body => body_html,
        print_note,
    })?)
}
