//! Calculator tool using meval for safe expression evaluation.

use super::keywords::{clean_word, mentions, mentions_any};
use crate::error::ToolError;
use crate::types::{Tool, ToolOutput};
use async_trait::async_trait;
use tracing::debug;

const MATH_KEYWORDS: &[&str] = &[
    "calculate", "compute", "math", "equation", "add", "subtract", "multiply", "divide",
    "sum", "total", "percent", "percentage", "%", "tip", "interest", "compound", "+", "-",
    "*", "/", "^", "what is", "what's", "how much", "equals", "plus", "minus", "times",
    "squared", "cubed", "sqrt",
];

const LEAD_INS: &[&str] = &[
    "calculate", "compute", "evaluate", "solve", "what is", "what's", "how much is",
];

/// Names meval understands; any other word disqualifies an expression.
const KNOWN_FUNCTIONS: &[&str] = &[
    "sqrt", "abs", "exp", "ln", "sin", "cos", "tan", "asin", "acos", "atan", "floor", "ceil",
    "round", "signum", "max", "min", "pi", "e",
];

/// Calculator tool for evaluating math found in a natural-language query.
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate arithmetic, percentages, tips and compound interest found in the query."
    }

    fn is_relevant(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        query.chars().any(|c| c.is_ascii_digit())
            && mentions_any(&query, MATH_KEYWORDS)
            && !extract_expressions(&query).is_empty()
    }

    async fn execute(&self, query: &str) -> Result<ToolOutput, ToolError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidQuery("Empty calculation query".into()));
        }

        let candidates = extract_expressions(query);
        if candidates.is_empty() {
            return Err(ToolError::InvalidQuery(
                "No mathematical expression found in query".into(),
            ));
        }

        let mut last_error = None;
        for expression in candidates {
            match evaluate(&expression) {
                Ok(value) => return Ok(format_output(query, &expression, value)),
                Err(e) => {
                    debug!(expression = %expression, error = %e, "Candidate expression rejected");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ToolError::MathError("No expression evaluated".into())))
    }
}

/// Candidate expressions, most specific first.
fn extract_expressions(query: &str) -> Vec<String> {
    let lower = normalize_numbers(&query.to_lowercase());
    let mut candidates = Vec::new();

    if mentions(&lower, "interest") {
        candidates.extend(compound_interest(&lower));
    }
    if lower.contains('%') || mentions(&lower, "percent") {
        candidates.extend(percentage(&lower));
    }
    candidates.extend(lead_in_expression(&lower));

    let whole = clean_expression(&lower);
    if is_expression(&whole) {
        candidates.push(whole);
    }
    candidates.extend(arithmetic_run(&lower));

    let mut seen = Vec::with_capacity(candidates.len());
    candidates.retain(|c| {
        let fresh = !seen.contains(c);
        if fresh {
            seen.push(c.clone());
        }
        fresh
    });
    candidates
}

/// `$P at R% for T years` as `P * (1 + R / 100)^T`.
fn compound_interest(lower: &str) -> Option<String> {
    let words: Vec<&str> = lower.split_whitespace().collect();
    let mut principal = None;
    let mut rate = None;
    let mut years = None;

    for (i, word) in words.iter().enumerate() {
        let next = words.get(i + 1).copied();
        if rate.is_none() {
            if let Some(r) = parse_percent(word, next) {
                rate = Some(r);
                continue;
            }
        }
        if let Some(n) = parse_amount(word) {
            let is_duration = next
                .map(clean_word)
                .is_some_and(|w| w.starts_with("year") || w == "yr" || w == "yrs");
            if is_duration {
                years.get_or_insert(n);
            } else if principal.is_none() {
                principal = Some(n);
            }
        }
    }

    Some(format!("{} * (1 + {} / 100)^{}", principal?, rate?, years?))
}

/// `X% of Y`, `X percent of Y`, `X% tip on $Y` as `X / 100 * Y`.
fn percentage(lower: &str) -> Option<String> {
    let words: Vec<&str> = lower.split_whitespace().collect();
    let (idx, rate) = words
        .iter()
        .enumerate()
        .find_map(|(i, w)| parse_percent(w, words.get(i + 1).copied()).map(|r| (i, r)))?;

    let rest = &words[idx + 1..];
    let base_words = rest
        .iter()
        .position(|w| matches!(clean_word(w), "of" | "on"))
        .map(|p| &rest[p + 1..])
        .unwrap_or(rest);
    let base = base_words.iter().find_map(|w| parse_amount(w))?;

    Some(format!("{} / 100 * {}", rate, base))
}

/// Text after "calculate", "what is" and friends, with word operators.
fn lead_in_expression(lower: &str) -> Option<String> {
    let start = LEAD_INS
        .iter()
        .filter_map(|lead| lower.find(lead).map(|i| i + lead.len()))
        .min()?;
    let expression = clean_expression(&lower[start..]);
    is_expression(&expression).then_some(expression)
}

/// Longest run of arithmetic characters containing an operator.
///
/// Runs that split a number at a comma or look like a date are skipped.
fn arithmetic_run(lower: &str) -> Option<String> {
    let is_run_char = |c: char| c.is_ascii_digit() || " +-*/^().".contains(c);
    let mut runs = Vec::new();
    let mut start = None;
    for (i, c) in lower.char_indices().chain(std::iter::once((lower.len(), ','))) {
        match (start, is_run_char(c) && i < lower.len()) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                runs.push((s, i));
                start = None;
            }
            _ => {}
        }
    }

    runs.into_iter()
        .filter(|&(s, e)| !splits_number(lower, s, e))
        .map(|(s, e)| lower[s..e].trim())
        .filter(|run| run.chars().any(|c| c.is_ascii_digit()))
        .filter(|run| run.chars().skip(1).any(|c| "+-*/^".contains(c)))
        .filter(|run| !looks_like_date(run))
        .max_by_key(|run| run.len())
        .map(str::to_string)
}

/// True if `lower[start..end]` begins or ends inside a comma-separated number.
fn splits_number(lower: &str, start: usize, end: usize) -> bool {
    let digit_at = |i: usize| lower.as_bytes().get(i).is_some_and(u8::is_ascii_digit);
    let before = start >= 2
        && lower.as_bytes()[start - 1] == b','
        && digit_at(start - 2)
        && digit_at(start);
    let after = end > start
        && lower.as_bytes().get(end) == Some(&b',')
        && digit_at(end - 1)
        && digit_at(end + 1);
    before || after
}

/// `2024-05-01`, `9/11`, `12/25/2024` and similar.
fn looks_like_date(run: &str) -> bool {
    if run.contains(char::is_whitespace) {
        return false;
    }
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());

    let dashed: Vec<&str> = run.split('-').collect();
    if dashed.len() == 3 && dashed.iter().all(|p| all_digits(p)) {
        return dashed[0].len() == 4 || dashed[2].len() == 4;
    }

    let slashed: Vec<&str> = run.split('/').collect();
    match slashed.as_slice() {
        [day, month] => all_digits(day) && all_digits(month) && day.len() <= 2 && month.len() <= 2,
        [a, b, year] => {
            [a, b, year].iter().all(|p| all_digits(p))
                && a.len() <= 2
                && b.len() <= 2
                && matches!(year.len(), 2 | 4)
        }
        _ => false,
    }
}

/// Drop thousands separators and currency signs glued to numbers.
fn normalize_numbers(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut normalized = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let rest = &chars[i + 1..];
        let thousands = c == ','
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && rest.len() >= 3
            && rest[..3].iter().all(char::is_ascii_digit)
            && !rest.get(3).is_some_and(char::is_ascii_digit);
        let currency = c == '$' && rest.first().is_some_and(char::is_ascii_digit);
        if !(thousands || currency) {
            normalized.push(c);
        }
    }
    normalized
}

fn clean_expression(text: &str) -> String {
    let text = text
        .replace("multiplied by", " * ")
        .replace("divided by", " / ")
        .replace("to the power of", " ^ ");

    let mut parts = Vec::new();
    for word in text.split_whitespace() {
        let word = word.trim_end_matches(|c| matches!(c, '?' | '!' | ',' | '.'));
        let mapped = match word {
            "plus" => "+",
            "minus" => "-",
            "times" | "x" => "*",
            "over" => "/",
            "squared" => "^2",
            "cubed" => "^3",
            "equals" | "equal" | "is" | "the" | "result" | "answer" | "of" | "=" | "please"
            | "" => continue,
            other => other,
        };
        parts.push(mapped);
    }
    parts.join(" ")
}

fn is_expression(expression: &str) -> bool {
    let charset_ok = expression
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || "+-*/^().,".contains(c));
    let names_ok = expression
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .all(|w| KNOWN_FUNCTIONS.contains(&w));

    charset_ok
        && names_ok
        && commas_only_in_calls(expression)
        && expression.chars().any(|c| c.is_ascii_digit())
}

/// Commas may only separate function arguments, as in `max(1, 2)`.
fn commas_only_in_calls(expression: &str) -> bool {
    let mut depth = 0i32;
    for c in expression.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth <= 0 => return false,
            _ => {}
        }
    }
    true
}

fn parse_amount(word: &str) -> Option<f64> {
    let word = clean_word(word).trim_start_matches('$').replace(',', "");
    if !word.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    word.parse().ok()
}

fn parse_percent(word: &str, next: Option<&str>) -> Option<f64> {
    let word = clean_word(word);
    if let Some(number) = word.strip_suffix('%') {
        return parse_amount(number);
    }
    if next.map(clean_word) == Some("percent") {
        return parse_amount(word);
    }
    None
}

fn evaluate(expression: &str) -> Result<f64, ToolError> {
    let value = meval::eval_str(expression).map_err(|e| ToolError::MathError(e.to_string()))?;
    if !value.is_finite() {
        return Err(ToolError::MathError(format!(
            "'{}' does not evaluate to a finite number",
            expression
        )));
    }
    Ok(value)
}

fn format_output(query: &str, expression: &str, value: f64) -> ToolOutput {
    let lower = query.to_lowercase();
    let mut content = format!("Calculation: {} = {}", expression, format_value(value));

    if query.contains('$') || mentions_any(&lower, &["interest", "tip", "dollars"]) {
        content.push_str(&format!("\nAmount: ${}", format_money(value)));
    }

    ToolOutput::new(content).with_confidence(0.95)
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let fixed = format!("{:.4}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}
