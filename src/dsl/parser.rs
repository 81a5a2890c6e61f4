//! Parser for the board description.

use std::collections::HashMap;

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::circuit::{Point3, SlotId};
use crate::error::{CirsimError, Result};

/// Parser for board descriptions.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire board description.
    pub fn parse(&mut self) -> Result<BoardAst> {
        let mut ast = BoardAst::new();

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let element = self.parse_element()?;
                    ast.elements.push(element);
                }
                _ => {
                    return Err(CirsimError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            match self.current.kind {
                TokenKind::Newline => self.advance()?,
                TokenKind::Eof => {}
                _ => {
                    return Err(CirsimError::parse(
                        self.current.line,
                        format!("unexpected trailing token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(CirsimError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn expect_value(&mut self) -> Result<f64> {
        let tok = self.expect(TokenKind::Number)?;
        parse_value(&tok.text)
            .ok_or_else(|| CirsimError::parse(tok.line, format!("invalid number: {}", tok.text)))
    }

    fn parse_slot(&mut self) -> Result<SlotId> {
        let tok = self.current.clone();
        match tok.kind {
            TokenKind::Number => {
                self.advance()?;
                let slot = tok
                    .text
                    .parse::<u64>()
                    .ok()
                    .filter(|&s| SlotId(s).is_valid())
                    .ok_or_else(|| {
                        CirsimError::parse(tok.line, format!("invalid slot: {}", tok.text))
                    })?;
                Ok(SlotId(slot))
            }
            TokenKind::Identifier if tok.text.eq_ignore_ascii_case("NC") => {
                self.advance()?;
                Ok(SlotId::INVALID)
            }
            _ => Err(CirsimError::parse(
                tok.line,
                format!("expected slot number or NC, got {:?}", tok.text),
            )),
        }
    }

    fn parse_directive(&mut self, ast: &mut BoardAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".pos" => {
                let slot = self.parse_slot()?;
                if !slot.is_valid() {
                    return Err(CirsimError::parse(line, ".pos requires a placed slot"));
                }
                let x = self.expect_value()?;
                let y = self.expect_value()?;
                let z = self.expect_value()?;
                ast.positions.insert(slot, Point3::new(x, y, z));
            }
            ".probe" => {
                let first = self.expect(TokenKind::Identifier)?;
                ast.probes.push(first.text);
                while self.current.kind == TokenKind::Identifier {
                    ast.probes.push(self.current.text.clone());
                    self.advance()?;
                }
            }
            _ => {
                return Err(CirsimError::parse(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(())
    }

    fn parse_element(&mut self) -> Result<ElementDef> {
        let name = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        let first_char = name.chars().next().unwrap_or('?');
        let element_type = ElementType::from_prefix(first_char).ok_or_else(|| {
            CirsimError::UnknownComponentType {
                component_type: name.clone(),
                line,
            }
        })?;

        let terminals = [self.parse_slot()?, self.parse_slot()?];

        let mut value = None;
        let mut ac = false;
        let mut params = HashMap::new();

        while self.current.kind != TokenKind::Newline && self.current.kind != TokenKind::Eof {
            let tok = self.current.clone();
            match tok.kind {
                TokenKind::Identifier => {
                    self.advance()?;
                    if self.current.kind == TokenKind::Equals {
                        self.advance()?;
                        let v = self.expect_value()?;
                        params.insert(tok.text.to_lowercase(), v);
                    } else if tok.text.eq_ignore_ascii_case("AC") {
                        ac = true;
                    } else if tok.text.eq_ignore_ascii_case("DC") {
                        ac = false;
                    } else {
                        return Err(CirsimError::invalid_component(
                            &name,
                            line,
                            format!("unexpected word '{}'", tok.text),
                        ));
                    }
                }
                TokenKind::Number => {
                    self.advance()?;
                    let v = parse_value(&tok.text).ok_or_else(|| {
                        CirsimError::parse(line, format!("invalid number: {}", tok.text))
                    })?;
                    if value.replace(v).is_some() {
                        return Err(CirsimError::invalid_component(
                            &name,
                            line,
                            "more than one value given",
                        ));
                    }
                }
                _ => break,
            }
        }

        if ac && element_type != ElementType::VoltageSource {
            return Err(CirsimError::invalid_component(
                &name,
                line,
                "only voltage sources can be AC",
            ));
        }

        Ok(ElementDef {
            element_type,
            name,
            terminals,
            value,
            ac,
            params,
            line,
        })
    }
}
