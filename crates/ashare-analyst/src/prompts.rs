//! Prompts for the analyst agent
//!
//! The system prompt fixes the report layout. The task message names the
//! stock and the tools to use and is rendered per run with MiniJinja.

use crate::error::Result;
use minijinja::{Environment, context};

/// Fixed system prompt: a five-section Chinese report in Markdown
pub const SYSTEM_PROMPT: &str = r"你是一位专业的A股金融分析师。请基于工具提供的数据生成详细、专业、数据驱动的分析报告。

**重要：输出语言必须是简体中文，报告使用 Markdown 格式。**

报告结构（必须包含以下五个一级章节，按顺序排列）：

# 1. 公司概况
- 基本信息（公司名称、所属行业、上市日期）
- 经营范围
- 最新市值和股价信息

# 2. 财务分析
- 盈利能力分析（ROE、毛利率）
- 成长性分析（净利润增长率）
- 财务状况评估
- EPS分析（每股收益TTM和预测）

# 3. 估值分析
- PE（市盈率）分析
- PB（市净率）分析
- 与行业平均值的比较（如有数据）
- 价格走势与技术指标：近期价格走势、成交量、关键支撑/阻力位、移动平均线、beta

# 4. 风险提示
- 财务风险（债务权益比、流动比率等）
- 市场风险（beta、波动率）
- 行业特定风险

# 5. 投资建议
- 综合评估
- 投资评级（买入/持有/卖出）
- 目标价格区间（如有）

规则：
- 数值为 0 或为空通常表示数据缺失，请说明数据暂不可用，不要据此下结论。
- 部分数据来自雅虎财经（yfinance）接口，字段可能是英文，请翻译为中文后呈现在报告中。
- 工具调用失败时，基于已获得的数据继续分析，并在报告中注明缺失的数据。
- 最终回复只包含报告本身，不要附加其他说明。";

const TASK_TEMPLATE: &str = "请分析股票代码 {{ symbol }} (A股)，报告日期 {{ date }}。
请使用提供的工具获取以下信息：
1. 公司基本信息
2. 市场估值数据（PE、PB、市值、EPS、行业平均值）
3. 财务指标（ROE、毛利率、净利润增长率）
4. 最近30个交易日的价格历史
5. 实时股价及技术指标
6. 风险指标（beta、债务权益比、波动率等）

基于这些数据，生成一份完整的分析报告。";

/// Sent once the tool budget is spent
pub const EXHAUSTED_PROMPT: &str =
    "工具调用次数已用完。请不要再调用任何工具，直接基于已获得的数据输出完整的 Markdown 分析报告。";

/// Task message for one stock
pub fn render_task(symbol: &str, date: &str) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(TASK_TEMPLATE, context! { symbol, date })?)
}
