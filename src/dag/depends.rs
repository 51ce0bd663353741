//! Parser for the `depends` boolean expression of a DAG task.
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | primary
//! primary := "(" or ")" | operand
//! operand := name [ "." result ] | quote name [ "." result ] quote
//! ```
//!
//! `!` binds tighter than `&&`, which binds tighter than `||`. Chains of
//! one operator are kept flat, so only `!` and parentheses nest, and their
//! depth is capped at [`MAX_NESTING`].

use std::fmt;
use std::str::FromStr;

/// Deepest run of `!` and `(` a `depends` expression may contain.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskResult {
    Succeeded,
    Failed,
    Errored,
    Skipped,
    Omitted,
    Daemoned,
    AnySucceeded,
    AllFailed,
}

impl TaskResult {
    pub const ALL: [TaskResult; 8] = [
        TaskResult::Succeeded,
        TaskResult::Failed,
        TaskResult::Errored,
        TaskResult::Skipped,
        TaskResult::Omitted,
        TaskResult::Daemoned,
        TaskResult::AnySucceeded,
        TaskResult::AllFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskResult::Succeeded => "Succeeded",
            TaskResult::Failed => "Failed",
            TaskResult::Errored => "Errored",
            TaskResult::Skipped => "Skipped",
            TaskResult::Omitted => "Omitted",
            TaskResult::Daemoned => "Daemoned",
            TaskResult::AnySucceeded => "AnySucceeded",
            TaskResult::AllFailed => "AllFailed",
        }
    }

    /// Results that only make sense for a task that loops over items.
    pub fn is_items_based(&self) -> bool {
        matches!(self, TaskResult::AnySucceeded | TaskResult::AllFailed)
    }
}

impl FromStr for TaskResult {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskResult::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependsExpr {
    Task {
        name: String,
        result: Option<TaskResult>,
    },
    Not(Box<DependsExpr>),
    /// Two or more operands.
    And(Vec<DependsExpr>),
    /// Two or more operands.
    Or(Vec<DependsExpr>),
}

/// How a task depends on one of its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyType {
    Plain,
    /// Through `.AnySucceeded` or `.AllFailed`.
    Items,
}

impl DependsExpr {
    /// Task names referenced by the expression, first occurrence first.
    pub fn dependencies(&self) -> Vec<(String, DependencyType)> {
        let mut out: Vec<(String, DependencyType)> = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<(String, DependencyType)>) {
        match self {
            DependsExpr::Task { name, result } => {
                let ty = match result {
                    Some(r) if r.is_items_based() => DependencyType::Items,
                    _ => DependencyType::Plain,
                };
                match out.iter_mut().find(|(n, _)| n == name) {
                    Some(entry) => {
                        if ty == DependencyType::Items {
                            entry.1 = ty;
                        }
                    }
                    None => out.push((name.clone(), ty)),
                }
            }
            DependsExpr::Not(inner) => inner.collect(out),
            DependsExpr::And(ops) | DependsExpr::Or(ops) => {
                for op in ops {
                    op.collect(out);
                }
            }
        }
    }
}

impl fmt::Display for DependsExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependsExpr::Task { name, result } => {
                let quote = name.starts_with(|c: char| c.is_ascii_digit());
                if quote {
                    f.write_str("'")?;
                }
                f.write_str(name)?;
                if let Some(r) = result {
                    write!(f, ".{}", r)?;
                }
                if quote {
                    f.write_str("'")?;
                }
                Ok(())
            }
            DependsExpr::Not(inner) => match inner.as_ref() {
                DependsExpr::Task { .. } | DependsExpr::Not(_) => write!(f, "!{}", inner),
                _ => write!(f, "!({})", inner),
            },
            DependsExpr::And(ops) => write_chain(f, ops, " && "),
            DependsExpr::Or(ops) => write_chain(f, ops, " || "),
        }
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, ops: &[DependsExpr], sep: &str) -> fmt::Result {
    for (i, op) in ops.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match op {
            DependsExpr::And(_) | DependsExpr::Or(_) => write!(f, "({})", op)?,
            _ => write!(f, "{}", op)?,
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependsError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unterminated quoted task name starting at offset {0}")]
    UnterminatedQuote(usize),
    #[error("task result '{result}' for task '{task}' is invalid")]
    InvalidResult { task: String, result: String },
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

// -----------------------------------------------------------------------------
// Lexer
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Operand(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Not => f.write_str("!"),
            Token::Operand(s) => f.write_str(s),
        }
    }
}

fn is_operand_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

fn tokenize(input: &str) -> Result<Vec<Token>, DependsError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) if next == c => {
                        tokens.push(if c == '&' { Token::And } else { Token::Or });
                    }
                    _ => return Err(DependsError::UnexpectedChar { ch: c, offset }),
                }
            }
            '\'' | '"' => {
                chars.next();
                let mut operand = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == c {
                        closed = true;
                        break;
                    }
                    operand.push(ch);
                }
                if !closed {
                    return Err(DependsError::UnterminatedQuote(offset));
                }
                tokens.push(Token::Operand(operand));
            }
            c if is_operand_char(c) => {
                let mut operand = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if !is_operand_char(ch) {
                        break;
                    }
                    operand.push(ch);
                    chars.next();
                }
                tokens.push(Token::Operand(operand));
            }
            other => return Err(DependsError::UnexpectedChar { ch: other, offset }),
        }
    }

    Ok(tokens)
}

// -----------------------------------------------------------------------------
// Parser
// -----------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn descend(&mut self) -> Result<(), DependsError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(DependsError::TooDeep(MAX_NESTING));
        }
        Ok(())
    }

    fn or(&mut self) -> Result<DependsExpr, DependsError> {
        let mut ops = vec![self.and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            ops.push(self.and()?);
        }
        Ok(chain(ops, DependsExpr::Or))
    }

    fn and(&mut self) -> Result<DependsExpr, DependsError> {
        let mut ops = vec![self.unary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            ops.push(self.unary()?);
        }
        Ok(chain(ops, DependsExpr::And))
    }

    fn unary(&mut self) -> Result<DependsExpr, DependsError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(DependsExpr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<DependsExpr, DependsError> {
        match self.next() {
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(DependsError::UnexpectedToken(other.to_string())),
                    None => Err(DependsError::UnexpectedEnd),
                }
            }
            Some(Token::Operand(text)) => operand(&text),
            Some(other) => Err(DependsError::UnexpectedToken(other.to_string())),
            None => Err(DependsError::UnexpectedEnd),
        }
    }
}

fn chain(
    mut ops: Vec<DependsExpr>,
    build: fn(Vec<DependsExpr>) -> DependsExpr,
) -> DependsExpr {
    if ops.len() == 1 {
        ops.swap_remove(0)
    } else {
        build(ops)
    }
}

fn operand(text: &str) -> Result<DependsExpr, DependsError> {
    let (name, result) = match text.split_once('.') {
        Some((name, result)) => (name, Some(result)),
        None => (text, None),
    };
    if name.is_empty() {
        return Err(DependsError::UnexpectedToken(text.to_string()));
    }
    let result = match result {
        Some(r) => Some(r.parse::<TaskResult>().map_err(|_| DependsError::InvalidResult {
            task: name.to_string(),
            result: r.to_string(),
        })?),
        None => None,
    };
    Ok(DependsExpr::Task {
        name: name.to_string(),
        result,
    })
}

/// Parse a `depends` expression.
pub fn parse(input: &str) -> Result<DependsExpr, DependsError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(DependsError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    match parser.next() {
        None => Ok(expr),
        Some(extra) => Err(DependsError::UnexpectedToken(extra.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, result: Option<TaskResult>) -> DependsExpr {
        DependsExpr::Task {
            name: name.into(),
            result,
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let e = parse("A || B && C").unwrap();
        assert_eq!(
            e,
            DependsExpr::Or(vec![
                task("A", None),
                DependsExpr::And(vec![task("B", None), task("C", None)])
            ])
        );
    }

    #[test]
    fn operator_chains_stay_flat() {
        let src = (0..2000).map(|i| format!("t{}", i)).collect::<Vec<_>>().join(" && ");
        match parse(&src).unwrap() {
            DependsExpr::And(ops) => assert_eq!(ops.len(), 2000),
            other => panic!("expected a flat chain, got {:?}", other),
        }
    }

    #[test]
    fn nesting_is_capped() {
        let ok = format!("{}A{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&ok).unwrap(), task("A", None));

        let deep = format!("{}A{}", "(".repeat(50_000), ")".repeat(50_000));
        assert_eq!(parse(&deep), Err(DependsError::TooDeep(MAX_NESTING)));

        let nots = format!("{}A", "!".repeat(50_000));
        assert_eq!(parse(&nots), Err(DependsError::TooDeep(MAX_NESTING)));

        let mixed = format!("{}A{}", "!(".repeat(MAX_NESTING / 2 + 1), ")".repeat(MAX_NESTING / 2 + 1));
        assert_eq!(parse(&mixed), Err(DependsError::TooDeep(MAX_NESTING)));
    }

    #[test]
    fn not_and_results() {
        let e = parse("!A.Failed && (B.Succeeded || C.Skipped)").unwrap();
        let names: Vec<String> = e.dependencies().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert!(matches!(e, DependsExpr::And(ref ops) if matches!(ops[0], DependsExpr::Not(_))));
    }

    #[test]
    fn quoted_operands() {
        let e = parse("'1st-task'.Succeeded && \"other\"").unwrap_err();
        // the result suffix belongs inside the quotes
        assert_eq!(e, DependsError::UnexpectedToken(".Succeeded".into()));

        let e = parse("'1st-task.Succeeded' && \"other\"").unwrap();
        assert_eq!(
            e.dependencies(),
            vec![
                ("1st-task".to_string(), DependencyType::Plain),
                ("other".to_string(), DependencyType::Plain)
            ]
        );
    }

    #[test]
    fn items_results_mark_dependency() {
        let e = parse("A.AnySucceeded || A.Failed || B").unwrap();
        assert_eq!(
            e.dependencies(),
            vec![
                ("A".to_string(), DependencyType::Items),
                ("B".to_string(), DependencyType::Plain)
            ]
        );
    }

    #[test]
    fn rejects_invalid_input() {
        assert_eq!(parse("  "), Err(DependsError::Empty));
        assert_eq!(parse("A &"), Err(DependsError::UnexpectedChar { ch: '&', offset: 2 }));
        assert_eq!(parse("(A || B"), Err(DependsError::UnexpectedEnd));
        assert_eq!(parse("A B"), Err(DependsError::UnexpectedToken("B".into())));
        assert_eq!(parse("'A"), Err(DependsError::UnterminatedQuote(0)));
        assert_eq!(
            parse("A.Finished").unwrap_err().to_string(),
            "task result 'Finished' for task 'A' is invalid"
        );
    }

    #[test]
    fn display_round_trips() {
        for src in [
            "A",
            "A.Succeeded && B",
            "(A || B) && !C.Failed",
            "!(A && B) || C.AllFailed",
            "(A || B) || (C && D) && E",
            "'2nd.Errored' || x",
        ] {
            let parsed = parse(src).unwrap();
            let printed = parsed.to_string();
            assert_eq!(parse(&printed).unwrap(), parsed, "{} -> {}", src, printed);
        }
    }
}
