//! Sandboxed filter-expression grammar for selection queries.
//!
//! The grammar supports comparisons (`== != < <= > >=`), boolean
//! combinators (`and`/`or`/`not`, also `&& || !`), membership tests
//! (`attr in ['a', 'b']`) and parentheses. Attribute references are bare
//! identifiers or `attr.name`; `id` and `time` refer to the entity's id
//! and time role. Nothing is ever executed: expressions are parsed into a
//! small AST and evaluated per entity.

use crate::data::entity::{AttrValue, Entity, EntityTable};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidQuery(msg.into())
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
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
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Eq);
                } else {
                    return Err(invalid("single '=' (use '==')"));
                }
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_some() {
                    tokens.push(Token::And);
                } else {
                    return Err(invalid("single '&' (use '&&' or 'and')"));
                }
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_some() {
                    tokens.push(Token::Or);
                } else {
                    return Err(invalid("single '|' (use '||' or 'or')"));
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => s.push(ch),
                        None => return Err(invalid("unterminated string literal")),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let mut s = String::new();
                s.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || d == '-' || d == '+'
                    {
                        // Only allow sign right after an exponent marker.
                        if (d == '-' || d == '+')
                            && !matches!(s.chars().last(), Some('e') | Some('E'))
                        {
                            break;
                        }
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n: f64 = s
                    .parse()
                    .map_err(|_| invalid(format!("bad number '{s}'")))?;
                tokens.push(Token::Num(n));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut s = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' || d == '.' {
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match s.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    "in" => tokens.push(Token::In),
                    "true" => tokens.push(Token::Num(1.0)),
                    "false" => tokens.push(Token::Num(0.0)),
                    _ => tokens.push(Token::Ident(s)),
                }
            }
            other => return Err(invalid(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Mirror the operator for a flipped comparison (`3 < x` → `x > 3`).
    fn flip(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Num(f64),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Cmp {
        attr: String,
        op: CmpOp,
        value: Literal,
    },
    In {
        attr: String,
        values: Vec<Literal>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// A parsed, validated filter query ready to match entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    expr: Expr,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Attr(String),
    Lit(Literal),
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, t: &Token) -> Result<()> {
        match self.next() {
            Some(ref got) if got == t => Ok(()),
            other => Err(invalid(format!("expected {t:?}, got {other:?}"))),
        }
    }

    // or_expr := and_expr ( 'or' and_expr )*
    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // and_expr := unary ( 'and' unary )*
    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // unary := 'not' unary | '(' or_expr ')' | comparison
    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            Some(Token::LParen) => {
                // A parenthesis may open a grouped boolean expression or a
                // parenthesized comparison; both parse the same way here.
                self.pos += 1;
                let e = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            _ => self.comparison(),
        }
    }

    // comparison := operand cmp_op operand | operand 'in' list | operand 'not' 'in' list
    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.operand()?;
        match self.next() {
            Some(Token::In) => {
                let attr = match lhs {
                    Operand::Attr(a) => a,
                    Operand::Lit(_) => return Err(invalid("'in' needs an attribute on the left")),
                };
                let values = self.literal_list()?;
                Ok(Expr::In { attr, values })
            }
            Some(Token::Not) => {
                self.expect(&Token::In)?;
                let attr = match lhs {
                    Operand::Attr(a) => a,
                    Operand::Lit(_) => return Err(invalid("'in' needs an attribute on the left")),
                };
                let values = self.literal_list()?;
                Ok(Expr::Not(Box::new(Expr::In { attr, values })))
            }
            Some(tok) => {
                let op = match tok {
                    Token::Eq => CmpOp::Eq,
                    Token::Ne => CmpOp::Ne,
                    Token::Lt => CmpOp::Lt,
                    Token::Le => CmpOp::Le,
                    Token::Gt => CmpOp::Gt,
                    Token::Ge => CmpOp::Ge,
                    other => return Err(invalid(format!("expected comparison, got {other:?}"))),
                };
                let rhs = self.operand()?;
                match (lhs, rhs) {
                    (Operand::Attr(attr), Operand::Lit(value)) => {
                        Ok(Expr::Cmp { attr, op, value })
                    }
                    (Operand::Lit(value), Operand::Attr(attr)) => Ok(Expr::Cmp {
                        attr,
                        op: op.flip(),
                        value,
                    }),
                    (Operand::Attr(_), Operand::Attr(_)) => {
                        Err(invalid("attribute-to-attribute comparison is not supported"))
                    }
                    (Operand::Lit(_), Operand::Lit(_)) => {
                        Err(invalid("comparison needs an attribute on one side"))
                    }
                }
            }
            None => Err(invalid("dangling operand at end of query")),
        }
    }

    fn operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some(Token::Ident(name)) => {
                // `attr.` is an optional namespace prefix for attributes.
                let name = name.strip_prefix("attr.").unwrap_or(&name).to_string();
                Ok(Operand::Attr(name))
            }
            Some(Token::Str(s)) => Ok(Operand::Lit(Literal::Str(s))),
            Some(Token::Num(n)) => Ok(Operand::Lit(Literal::Num(n))),
            other => Err(invalid(format!("expected operand, got {other:?}"))),
        }
    }

    fn literal_list(&mut self) -> Result<Vec<Literal>> {
        self.expect(&Token::LBracket)?;
        let mut values = Vec::new();
        loop {
            match self.next() {
                Some(Token::Str(s)) => values.push(Literal::Str(s)),
                Some(Token::Num(n)) => values.push(Literal::Num(n)),
                Some(Token::RBracket) if values.is_empty() => return Ok(values),
                other => return Err(invalid(format!("expected literal, got {other:?}"))),
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => return Ok(values),
                other => return Err(invalid(format!("expected ',' or ']', got {other:?}"))),
            }
        }
    }
}

impl Query {
    /// Parse an expression and validate every referenced attribute against
    /// the table, so a typo fails loudly instead of selecting nothing.
    pub fn parse(input: &str, table: &EntityTable) -> Result<Query> {
        if input.trim().is_empty() {
            return Err(invalid("empty query"));
        }
        let tokens = lex(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(invalid(format!(
                "trailing tokens after position {}",
                parser.pos
            )));
        }
        let q = Query { expr };
        q.validate(table)?;
        Ok(q)
    }

    fn validate(&self, table: &EntityTable) -> Result<()> {
        fn walk(expr: &Expr, table: &EntityTable) -> Result<()> {
            match expr {
                Expr::Cmp { attr, .. } | Expr::In { attr, .. } => {
                    let known = attr == "id"
                        || attr == "time"
                        || table.attr_kind(attr).is_some()
                        || table.pc_index(attr).is_some();
                    if known {
                        Ok(())
                    } else {
                        Err(invalid(format!("unknown attribute '{attr}'")))
                    }
                }
                Expr::And(a, b) | Expr::Or(a, b) => {
                    walk(a, table)?;
                    walk(b, table)
                }
                Expr::Not(e) => walk(e, table),
            }
        }
        walk(&self.expr, table)
    }

    /// Whether the entity matches. Missing values never match.
    pub fn matches(&self, entity: &Entity, table: &EntityTable) -> bool {
        eval(&self.expr, entity, table)
    }
}

fn attr_value(entity: &Entity, table: &EntityTable, attr: &str) -> Option<AttrValue> {
    if attr == "id" {
        return Some(AttrValue::Text(entity.id.clone()));
    }
    if attr == "time" {
        return entity.time.map(AttrValue::Number);
    }
    if let Some(v) = entity.attributes.get(attr) {
        return Some(v.clone());
    }
    table
        .pc_index(attr)
        .and_then(|i| entity.coord(i))
        .map(AttrValue::Number)
}

fn compare(value: &AttrValue, op: CmpOp, lit: &Literal) -> bool {
    // Numeric comparison when both sides are numeric, string otherwise.
    match (value.as_number(), lit) {
        (Some(a), Literal::Num(b)) => match op {
            CmpOp::Eq => a == *b,
            CmpOp::Ne => a != *b,
            CmpOp::Lt => a < *b,
            CmpOp::Le => a <= *b,
            CmpOp::Gt => a > *b,
            CmpOp::Ge => a >= *b,
        },
        _ => {
            let a = value.as_key();
            let b = match lit {
                Literal::Str(s) => s.clone(),
                Literal::Num(n) => AttrValue::Number(*n).as_key(),
            };
            match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
            }
        }
    }
}

fn eval(expr: &Expr, entity: &Entity, table: &EntityTable) -> bool {
    match expr {
        Expr::Cmp { attr, op, value } => match attr_value(entity, table, attr) {
            Some(v) => compare(&v, *op, value),
            None => false,
        },
        Expr::In { attr, values } => match attr_value(entity, table, attr) {
            Some(v) => values.iter().any(|lit| compare(&v, CmpOp::Eq, lit)),
            None => false,
        },
        Expr::And(a, b) => eval(a, entity, table) && eval(b, entity, table),
        Expr::Or(a, b) => eval(a, entity, table) || eval(b, entity, table),
        Expr::Not(e) => !eval(e, entity, table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::entity::Entity;

    fn table() -> EntityTable {
        EntityTable::new(
            vec![
                Entity::new("s1", vec![0.1])
                    .with_attr("region", "Europe")
                    .with_attr("year", 2005.0),
                Entity::new("s2", vec![0.2])
                    .with_attr("region", "Europe")
                    .with_attr("year", 1990.0),
                Entity::new("s3", vec![0.3]).with_attr("region", "Asia"),
            ],
            vec!["PC1".into()],
        )
        .unwrap()
    }

    fn ids_matching(q: &str, t: &EntityTable) -> Vec<String> {
        let query = Query::parse(q, t).unwrap();
        t.iter()
            .filter(|e| query.matches(e, t))
            .map(|e| e.id.clone())
            .collect()
    }

    #[test]
    fn comparison_and_conjunction() {
        let t = table();
        assert_eq!(
            ids_matching("attr.region == 'Europe' and attr.year > 2000", &t),
            vec!["s1"]
        );
        assert_eq!(ids_matching("region == 'Europe'", &t), vec!["s1", "s2"]);
    }

    #[test]
    fn missing_value_never_matches() {
        let t = table();
        // s3 has no year; neither the comparison nor its negation sees it
        // as having a value, but `not` still inverts the match result.
        assert_eq!(ids_matching("year > 0", &t), vec!["s1", "s2"]);
        assert_eq!(ids_matching("not year > 0", &t), vec!["s3"]);
    }

    #[test]
    fn membership_and_or() {
        let t = table();
        assert_eq!(
            ids_matching("region in ['Asia', 'Africa'] or year <= 1990", &t),
            vec!["s2", "s3"]
        );
        assert_eq!(ids_matching("region not in ['Europe']", &t), vec!["s3"]);
    }

    #[test]
    fn flipped_literal_side() {
        let t = table();
        assert_eq!(ids_matching("2000 < year", &t), vec!["s1"]);
    }

    #[test]
    fn id_time_and_pc_references() {
        let t = table();
        assert_eq!(ids_matching("id == 's2'", &t), vec!["s2"]);
        assert_eq!(ids_matching("PC1 >= 0.2", &t), vec!["s2", "s3"]);
    }

    #[test]
    fn parse_errors() {
        let t = table();
        assert!(Query::parse("", &t).is_err());
        assert!(Query::parse("region = 'Europe'", &t).is_err());
        assert!(Query::parse("region == 'Europe' and", &t).is_err());
        assert!(Query::parse("nosuch == 1", &t).is_err());
        assert!(Query::parse("region == 'Europe' extra", &t).is_err());
        assert!(Query::parse("'a' == 'b'", &t).is_err());
    }

    #[test]
    fn symbolic_combinators() {
        let t = table();
        assert_eq!(
            ids_matching("region == \"Europe\" && !(year < 2000)", &t),
            vec!["s1"]
        );
    }
}
