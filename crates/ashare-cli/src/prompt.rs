//! Interactive prompts
//!
//! Generic over the reader and writer so the dialogue can be driven from
//! tests. End of input always yields `None`.

use std::io::{self, BufRead, Write};

/// Why a stock code was rejected, as shown to the user
pub fn validate_stock_code(code: &str) -> Result<&str, &'static str> {
    let code = code.trim();
    if code.is_empty() {
        Err("股票代码不能为空，请重新输入。")
    } else if !code.chars().all(|c| c.is_ascii_digit()) {
        Err("股票代码应为数字，请重新输入。")
    } else if code.len() != 6 {
        Err("股票代码应为6位数字，请重新输入。")
    } else {
        Ok(code)
    }
}

/// `y`/`yes`/`是` or `n`/`no`/`否`, case-insensitive
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "是" => Some(true),
        "n" | "no" | "否" => Some(false),
        _ => None,
    }
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{line}")
    }

    /// Print `prompt` and read one trimmed line
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn ask_api_key(&mut self) -> io::Result<Option<String>> {
        loop {
            let Some(key) = self.ask("\n请输入您的 OpenRouter API 密钥: ")? else {
                return Ok(None);
            };
            if !key.is_empty() {
                return Ok(Some(key));
            }
            self.say("API密钥不能为空，请重新输入。")?;
        }
    }

    /// Ask for a code until one is valid and confirmed
    pub fn ask_stock_code(&mut self) -> io::Result<Option<String>> {
        loop {
            let Some(input) = self.ask("\n请输入A股股票代码 (例如: 600519 贵州茅台): ")? else {
                return Ok(None);
            };
            let code = match validate_stock_code(&input) {
                Ok(code) => code.to_string(),
                Err(message) => {
                    self.say(message)?;
                    continue;
                }
            };

            let Some(answer) = self.ask(&format!("确认分析股票 {code}？(y/n): "))? else {
                return Ok(None);
            };
            match parse_yes_no(&answer) {
                Some(true) => return Ok(Some(code)),
                Some(false) => {}
                None => self.say("输入无效，请重新输入股票代码。")?,
            }
        }
    }

    /// Ask until the answer is yes or no
    pub fn ask_continue(&mut self) -> io::Result<Option<bool>> {
        loop {
            let Some(answer) = self.ask("\n是否继续分析其他股票？(y/n): ")? else {
                return Ok(None);
            };
            match parse_yes_no(&answer) {
                Some(yes) => return Ok(Some(yes)),
                None => self.say("请输入 'y' 或 'n'")?,
            }
        }
    }
}
