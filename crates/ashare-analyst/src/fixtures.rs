//! Fixture providers for tests

use crate::api::{
    DailyBar, FallbackProvider, FinancialRow, HistoryRange, InfoItem, PeerTables,
    PrimaryProvider, SpotRow, TickerInfo,
};
use crate::api::eastmoney::{
    parse_financial_indicators, parse_individual_info, parse_peer_tables, parse_spot_page,
};
use crate::error::{Result, StockError};
use crate::report::PdfEngine;
use crate::retry::{RetryPolicy, RetryingFallback};
use crate::tools::MarketData;
use ashare_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, Role, StopReason, TokenUsage,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Market data over fixture providers, retrying without delay
pub fn market_data(primary: FakePrimary, fallback: FakeFallback) -> Arc<MarketData> {
    Arc::new(MarketData::new(
        Arc::new(primary),
        RetryingFallback::new(Arc::new(fallback), RetryPolicy::new(2, Duration::ZERO))
            .with_summary_policy(RetryPolicy::new(1, Duration::ZERO)),
    ))
}

/// Primary provider serving fixed tables; `None` fields fail
#[derive(Default)]
pub struct FakePrimary {
    pub info: Option<Vec<InfoItem>>,
    pub spot: Option<Vec<SpotRow>>,
    pub financials: Option<Vec<FinancialRow>>,
    pub history: Option<Vec<DailyBar>>,
    pub peers: Option<PeerTables>,
}

impl FakePrimary {
    pub fn moutai() -> Self {
        Self {
            info: Some(moutai_info_items()),
            spot: Some(spot_rows()),
            financials: Some(financial_rows()),
            history: Some(daily_bars(60)),
            peers: Some(peer_tables()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

fn missing<T>(what: &str) -> Result<T> {
    Err(StockError::ApiError(format!("fixture: {what} unavailable")))
}

#[async_trait]
impl PrimaryProvider for FakePrimary {
    async fn individual_info(&self, _code: &str) -> Result<Vec<InfoItem>> {
        self.info.clone().map_or_else(|| missing("info"), Ok)
    }

    async fn spot_table(&self) -> Result<Vec<SpotRow>> {
        self.spot.clone().map_or_else(|| missing("spot"), Ok)
    }

    async fn financial_indicators(&self, _code: &str) -> Result<Vec<FinancialRow>> {
        self.financials.clone().map_or_else(|| missing("financials"), Ok)
    }

    async fn daily_history(&self, _code: &str, sessions: usize) -> Result<Vec<DailyBar>> {
        let bars = self.history.clone().map_or_else(|| missing("history"), Ok)?;
        let skip = bars.len().saturating_sub(sessions);
        Ok(bars.into_iter().skip(skip).collect())
    }

    async fn industry_comparison(&self, _code: &str) -> Result<PeerTables> {
        self.peers.clone().map_or_else(|| missing("peers"), Ok)
    }
}

/// Secondary provider with a call counter
#[derive(Default)]
pub struct FakeFallback {
    pub info: Option<TickerInfo>,
    pub history: Option<Vec<DailyBar>>,
    pub(crate) info_calls: AtomicU32,
}

impl FakeFallback {
    pub fn moutai() -> Self {
        Self {
            info: Some(moutai_ticker_info()),
            history: Some(daily_bars(250)),
            info_calls: AtomicU32::new(0),
        }
    }

    /// Answers with the stub payload Yahoo sends for unknown symbols
    pub fn degenerate() -> Self {
        Self {
            info: Some(ticker_info(json!({"trailingPegRatio": null}))),
            history: Some(Vec::new()),
            info_calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn info_calls(&self) -> u32 {
        self.info_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackProvider for FakeFallback {
    async fn ticker_info(&self, _code: &str) -> Result<TickerInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.info
            .clone()
            .ok_or_else(|| StockError::YahooFinanceError("fixture: 429 Too Many Requests".into()))
    }

    async fn history(&self, _code: &str, _range: HistoryRange) -> Result<Vec<DailyBar>> {
        self.history
            .clone()
            .ok_or_else(|| StockError::YahooFinanceError("fixture: history unavailable".into()))
    }
}

pub fn ticker_info(value: Value) -> TickerInfo {
    match value {
        Value::Object(map) => TickerInfo(map),
        _ => TickerInfo::default(),
    }
}

/// `stock/get` answer for 600519
pub fn quote_body() -> Value {
    json!({
        "rc": 0,
        "data": {
            "f43": 1520.0, "f57": "600519", "f58": "贵州茅台",
            "f84": 1_256_197_800.0, "f85": 1_256_197_800.0, "f127": "酿酒行业",
            "f116": 1_909_420_656_000.0, "f117": 1_909_420_656_000.0, "f189": 20_010_827
        }
    })
}

pub fn moutai_info_items() -> Vec<InfoItem> {
    parse_individual_info("600519", &quote_body()).unwrap_or_default()
}

/// One `clist/get` page holding three rows
pub fn spot_body() -> Value {
    json!({
        "rc": 0,
        "data": {
            "total": 3,
            "diff": [
                {"f2": 130.5, "f9": 15.2, "f12": "000858", "f14": "五粮液", "f20": 1.305e11, "f23": 3.9},
                {"f2": 1521.0, "f9": 22.35, "f12": "600519", "f14": "贵州茅台", "f20": 1.521e12, "f23": 7.8},
                {"f2": 250.0, "f9": 25.0, "f12": "300750", "f14": "宁德时代", "f20": 2.5e11, "f23": 5.1}
            ]
        }
    })
}

pub fn spot_rows() -> Vec<SpotRow> {
    parse_spot_page(&spot_body()).0
}

/// `RPT_DMSK_FN_INDICATOR` answer with six periods in scrambled order
pub fn financial_body() -> Value {
    let row = |date: &str, roe: f64| {
        json!({
            "SECUCODE": "600519.SH",
            "SECURITY_CODE": "600519",
            "REPORT_DATE": format!("{date} 00:00:00"),
            "WEIGHTAVG_ROE": roe,
            "XSMLL": 91.5,
            "GSJLRTBZZ": 15.0,
            "TOTALOPERATEREVE": 1.2e11,
            "PARENTNETPROFIT": 6.0e10
        })
    };
    json!({
        "success": true,
        "result": {"data": [
            row("2023-12-31", 34.2),
            row("2024-06-30", 19.0),
            row("2023-06-30", 16.7),
            row("2024-09-30", 25.6),
            row("2024-03-31", 9.8),
            row("2023-09-30", 24.9)
        ]}
    })
}

pub fn financial_rows() -> Vec<FinancialRow> {
    parse_financial_indicators("600519", &financial_body()).unwrap_or_default()
}

/// `count` consecutive bars, oldest first, closing from 1400 upward
pub fn daily_bars(count: usize) -> Vec<DailyBar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default();
    (0..count)
        .map(|i| {
            let close = 1400.0 + i as f64;
            DailyBar {
                date: (start + chrono::Duration::days(i as i64))
                    .format("%Y-%m-%d")
                    .to_string(),
                open: close - 2.0,
                close,
                high: close + 5.0,
                low: close - 5.0,
                volume: 30_000.0 + i as f64,
                change_percent: Some(0.07),
            }
        })
        .collect()
}

/// `PageAjax` answer: growth (`czxbj`) and valuation (`gzbj`) peer tables
pub fn peer_body() -> Value {
    json!({
        "czxbj": {"data": [
            {"PAIMING": "1", "CORRE_SECURITY_CODE": "600519", "CORRE_SECURITY_NAME": "贵州茅台",
             "MGSYZZL_3Y": 17.2, "MGSYZZL_TTM": 15.4},
            {"PAIMING": "", "CORRE_SECURITY_CODE": "", "CORRE_SECURITY_NAME": "行业平均",
             "MGSYZZL_3Y": 12.1, "MGSYZZL_TTM": 8.4,
             "YYSRZZL_3Y": 10.3, "YYSRZZL_TTM": 7.7,
             "JLRZZL_3Y": 11.9, "JLRZZL_TTM": 6.5},
            {"PAIMING": "", "CORRE_SECURITY_CODE": "", "CORRE_SECURITY_NAME": "行业中值",
             "MGSYZZL_3Y": 9.0, "MGSYZZL_TTM": 5.0}
        ]},
        "gzbj": {"data": [
            {"PAIMING": "1", "CORRE_SECURITY_CODE": "600519", "CORRE_SECURITY_NAME": "贵州茅台",
             "PE_TTM": 22.4, "PB_MRQ": 7.9},
            {"PAIMING": "", "CORRE_SECURITY_CODE": "", "CORRE_SECURITY_NAME": "行业平均",
             "PE_TTM": 28.4, "PB_MRQ": 5.6, "PS_TTM": 8.1, "PEG": 2.3, "QYBS": 18.2}
        ]}
    })
}

pub fn peer_tables() -> PeerTables {
    parse_peer_tables("600519", &peer_body()).unwrap_or_default()
}

pub fn moutai_ticker_info() -> TickerInfo {
    ticker_info(json!({
        "longName": "Kweichow Moutai Co., Ltd.",
        "shortName": "KWEICHOW MOUTAI",
        "industry": "Beverages - Wineries & Distilleries",
        "sector": "Consumer Defensive",
        "longBusinessSummary": "Kweichow Moutai Co., Ltd. produces and sells liquor products in China.",
        "fullTimeEmployees": 33302,
        "firstTradeDateEpochUtc": 998_877_600,
        "regularMarketPrice": 1520.5,
        "currentPrice": 1520.5,
        "previousClose": 1500.0,
        "regularMarketVolume": 2_800_000,
        "averageVolume": 3_100_000,
        "marketCap": 1.91e12,
        "floatShares": 1.2e9,
        "sharesOutstanding": 1.256e9,
        "trailingPE": 22.4,
        "priceToBook": 7.9,
        "trailingEps": 68.6,
        "forwardEps": 75.1,
        "beta": 0.82,
        "debtToEquity": 0.28,
        "currentRatio": 4.6,
        "quickRatio": 3.9,
        "totalDebt": 3.6e8,
        "earningsGrowth": 0.151,
        "revenueGrowth": 0.161,
        "returnOnEquity": 0.355,
        "grossMargins": 0.915,
        "totalRevenue": 1.64e11,
        "netIncomeToCommon": 8.3e10,
        "fiftyTwoWeekHigh": 1800.0,
        "fiftyTwoWeekLow": 1200.0,
        "fiftyDayAverage": 1480.0,
        "twoHundredDayAverage": 1550.0
    }))
}

/// LLM provider replaying scripted responses and recording requests
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<ashare_llm::Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(LLMError::AuthenticationFailed)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn text(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    pub fn tool_call(id: &str, name: &str, symbol: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: Some(MessageContent::Blocks(vec![ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: json!({ "symbol": symbol }),
                }])),
            },
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> ashare_llm::Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::text("# 报告")))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// PDF engine that succeeds or fails on command and counts its calls
pub struct FakeEngine {
    name: String,
    succeed: bool,
    partial: bool,
    calls: AtomicU32,
}

impl FakeEngine {
    pub fn new(name: &str, succeed: bool) -> Self {
        Self {
            name: name.to_string(),
            succeed,
            partial: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Writes half a PDF, then fails
    pub fn leaving_partial(name: &str) -> Self {
        Self {
            partial: true,
            ..Self::new(name, false)
        }
    }

    /// `failing` engines that fail; with `then_succeed`, two working ones follow
    pub fn chain(failing: usize, then_succeed: bool) -> Vec<Arc<FakeEngine>> {
        let working = if then_succeed { 2 } else { 0 };
        (0..failing + working)
            .map(|i| Arc::new(Self::new(&format!("engine-{i}"), i >= failing)))
            .collect()
    }

    pub fn as_dyn(engines: &[Arc<FakeEngine>]) -> Vec<Arc<dyn PdfEngine>> {
        engines
            .iter()
            .map(|e| e.clone() as Arc<dyn PdfEngine>)
            .collect()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfEngine for FakeEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn render(&self, html: &Path, pdf: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.partial {
            tokio::fs::write(pdf, b"%PDF-1.4 trunc").await?;
        }
        if !self.succeed {
            return Err(StockError::PdfEngine {
                engine: self.name.clone(),
                reason: "forced failure".to_string(),
            });
        }
        let html = tokio::fs::read(html).await?;
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(&html);
        tokio::fs::write(pdf, bytes).await?;
        Ok(())
    }
}
