use super::{ParseResult, Parser, describe};
use crate::codegen::Operator;
use crate::error::CompilerError;
use crate::scope::{Purpose, Storage};
use crate::token::{SpecialSymbol, TokenKind};
use crate::types::CType;

impl Parser<'_> {
    /// `<simple> [ <relop> <simple> ]`
    pub(super) fn expression(&mut self) -> ParseResult<CType> {
        let start = self.token.position;
        let left = self.simple_expression()?;

        let op = match self.token.kind {
            TokenKind::Special(SpecialSymbol::Equal) => Operator::Equal,
            TokenKind::Special(SpecialSymbol::NotEqual) => Operator::NotEqual,
            TokenKind::Special(SpecialSymbol::Less) => Operator::Less,
            TokenKind::Special(SpecialSymbol::LessOrEqual) => Operator::LessOrEqual,
            TokenKind::Special(SpecialSymbol::Greater) => Operator::Greater,
            TokenKind::Special(SpecialSymbol::GreaterOrEqual) => Operator::GreaterOrEqual,
            TokenKind::Special(SpecialSymbol::In) => {
                return Err(self.unsupported("set membership tests"));
            }
            _ => return Ok(left),
        };
        let symbol = self.token.kind.clone();
        self.advance();
        let right = self.simple_expression()?;

        let comparable = match op {
            Operator::Equal | Operator::NotEqual => {
                (left.is_numeric() && right.is_numeric())
                    || (left == right && matches!(left, CType::Boolean | CType::String))
            }
            _ => left.is_numeric() && right.is_numeric(),
        };
        if !comparable {
            return Err(CompilerError::type_error(
                format!("operator {symbol} cannot compare {left} with {right}"),
                self.span_from(start),
            ));
        }
        self.codegen.binary_op(op);
        Ok(CType::Boolean)
    }

    /// `[ + | - ] <term> { (+ | - | or) <term> }`
    fn simple_expression(&mut self) -> ParseResult<CType> {
        let start = self.token.position;
        let sign = match self.token.kind {
            TokenKind::Special(SpecialSymbol::Plus) => Some(Operator::Add),
            TokenKind::Special(SpecialSymbol::Minus) => Some(Operator::Sub),
            _ => None,
        };
        if sign.is_some() {
            self.advance();
        }

        let mut ty = self.term()?;
        if let Some(sign) = sign {
            if !ty.is_numeric() {
                return Err(CompilerError::type_error(
                    format!("a sign requires a numeric operand, found {ty}"),
                    self.span_from(start),
                ));
            }
            if sign == Operator::Sub {
                self.codegen.negate();
            }
        }

        loop {
            let op = match self.token.kind {
                TokenKind::Special(SpecialSymbol::Plus) => Operator::Add,
                TokenKind::Special(SpecialSymbol::Minus) => Operator::Sub,
                TokenKind::Special(SpecialSymbol::Or) => Operator::Or,
                _ => return Ok(ty),
            };
            self.advance();
            let right = self.term()?;
            ty = self.additive(op, ty, right, start)?;
        }
    }

    fn additive(
        &mut self,
        op: Operator,
        left: CType,
        right: CType,
        start: usize,
    ) -> ParseResult<CType> {
        match op {
            Operator::Add | Operator::Sub if left.is_numeric() && right.is_numeric() => {
                self.codegen.binary_op(op);
                Ok(left.cast(right))
            }
            Operator::Add if left == CType::String && right == CType::String => {
                self.codegen.concat_strings();
                Ok(CType::String)
            }
            Operator::Or if left == CType::Boolean && right == CType::Boolean => {
                self.codegen.binary_op(op);
                Ok(CType::Boolean)
            }
            _ => Err(self.operand_error(op, left, right, start)),
        }
    }

    /// `<factor> { (* | / | div | mod | and) <factor> }`
    fn term(&mut self) -> ParseResult<CType> {
        let start = self.token.position;
        let mut ty = self.factor()?;

        loop {
            let op = match self.token.kind {
                TokenKind::Special(SpecialSymbol::Star) => Operator::Mul,
                TokenKind::Special(SpecialSymbol::Slash | SpecialSymbol::Div) => Operator::Div,
                TokenKind::Special(SpecialSymbol::Mod) => Operator::Mod,
                TokenKind::Special(SpecialSymbol::And) => Operator::And,
                _ => return Ok(ty),
            };
            let integer_only = self.at(SpecialSymbol::Div) || self.at(SpecialSymbol::Mod);
            self.advance();
            let right = self.factor()?;

            ty = match op {
                Operator::Mul | Operator::Div
                    if !integer_only && ty.is_numeric() && right.is_numeric() =>
                {
                    ty.cast(right)
                }
                Operator::Div | Operator::Mod
                    if integer_only && ty == CType::Integer && right == CType::Integer =>
                {
                    CType::Integer
                }
                Operator::And if ty == CType::Boolean && right == CType::Boolean => CType::Boolean,
                _ => return Err(self.operand_error(op, ty, right, start)),
            };
            self.codegen.binary_op(op);
        }
    }

    /// Variable, constant, `not <factor>` or `( <expression> )`.
    fn factor(&mut self) -> ParseResult<CType> {
        let span = self.token.span();
        match &self.token.kind {
            TokenKind::Identifier(name) => {
                let info = self.scopes.lookup(name, span)?;
                let ty = info.ty;
                match (&info.purpose, &info.storage) {
                    (Purpose::Variable, Storage::Slot(slot)) => {
                        let slot = *slot;
                        self.codegen.push_slot(slot);
                    }
                    (Purpose::Const, Storage::Const(value)) => {
                        let value = value.clone();
                        self.codegen.push_const(value);
                    }
                    (purpose, _) => {
                        return Err(CompilerError::type_error(
                            format!("{} `{name}` cannot be used as a value", describe(*purpose)),
                            span,
                        ));
                    }
                }
                self.advance();
                Ok(ty)
            }
            TokenKind::IntConst(value) => {
                self.codegen.push_int(*value);
                self.advance();
                Ok(CType::Integer)
            }
            TokenKind::RealConst(value) => {
                self.codegen.push_real(*value);
                self.advance();
                Ok(CType::Real)
            }
            TokenKind::StringConst(value) => {
                let value = value.clone();
                self.codegen.push_string(value);
                self.advance();
                Ok(CType::String)
            }
            TokenKind::Special(SpecialSymbol::Not) => {
                self.advance();
                let ty = self.factor()?;
                if ty != CType::Boolean {
                    return Err(CompilerError::type_error(
                        format!("`not` requires a boolean operand, found {ty}"),
                        self.span_from(span.offset()),
                    ));
                }
                self.codegen.not();
                Ok(CType::Boolean)
            }
            TokenKind::Special(SpecialSymbol::LeftParen) => {
                self.advance();
                let ty = self.expression()?;
                self.accept(SpecialSymbol::RightParen)?;
                Ok(ty)
            }
            TokenKind::Special(SpecialSymbol::Nil) => Err(self.unsupported("pointers and `nil`")),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn operand_error(
        &self,
        op: Operator,
        left: CType,
        right: CType,
        start: usize,
    ) -> CompilerError {
        let symbol = match op {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "mod",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
        };
        CompilerError::type_error(
            format!("operator `{symbol}` cannot be applied to {left} and {right}"),
            self.span_from(start),
        )
    }
}
