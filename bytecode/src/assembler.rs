//! Textual assembler.
//!
//! ```text
//! ; comment
//! loop:                     ; label definition
//!     pop-arg 0
//!     new-str "hello world" ; string constant
//!     new-arr #3            ; integer constant
//!     syscall print         ; name resolved by the host
//!     jmp-lt-int @loop      ; relative jump
//! ```

use std::collections::HashMap;

use crate::builder::BytecodeBuilder;
use crate::error::AssembleError;
use crate::instruction::Instruction;
use crate::op::Op;

/// Resolves operands that need host knowledge.
pub trait OperandResolver {
    /// Constant-pool index of a string literal.
    fn string_constant(&mut self, text: &str) -> u32;
    /// Constant-pool index of an integer literal.
    fn int_constant(&mut self, value: i32) -> u32;
    /// Value of a bare identifier used as an operand of `op`
    /// (a syscall name, a class name, ...).
    fn name(&mut self, op: Op, name: &str) -> Option<i32>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Int(i32),
    Str(String),
    IntConst(i32),
    Label(String),
    Name(String),
}

#[derive(Debug)]
struct Line {
    number: usize,
    op: Op,
    operands: Vec<Operand>,
}

/// Assemble `source` into bytecode.
pub fn assemble(
    source: &str,
    resolver: &mut dyn OperandResolver,
) -> Result<Vec<u8>, AssembleError> {
    let mut labels = HashMap::new();
    let mut lines = Vec::new();
    let mut offset = 0usize;

    for (i, text) in source.lines().enumerate() {
        let number = i + 1;
        let mut tokens = tokenize(text, number)?.into_iter().peekable();

        while let Some(Token::Word(word)) = tokens.peek() {
            let Some(label) = word.strip_suffix(':') else {
                break;
            };
            if labels.insert(label.to_string(), offset).is_some() {
                return Err(AssembleError::DuplicateLabel {
                    line: number,
                    label: label.to_string(),
                });
            }
            tokens.next();
        }

        let Some(head) = tokens.next() else {
            continue;
        };
        let mnemonic = match head {
            Token::Word(w) => w,
            Token::Quoted(q) => {
                return Err(AssembleError::UnknownMnemonic {
                    line: number,
                    mnemonic: format!("\"{q}\""),
                });
            }
        };
        let op = Op::from_mnemonic(&mnemonic).ok_or(AssembleError::UnknownMnemonic {
            line: number,
            mnemonic,
        })?;

        let operands = tokens
            .map(|t| parse_operand(t, number))
            .collect::<Result<Vec<_>, _>>()?;
        if operands.len() != op.arity() {
            return Err(AssembleError::Arity {
                line: number,
                mnemonic: op.mnemonic(),
                expected: op.arity(),
                found: operands.len(),
            });
        }

        offset += op.encoded_len();
        lines.push(Line {
            number,
            op,
            operands,
        });
    }

    let mut builder = BytecodeBuilder::with_capacity(offset);
    for line in lines {
        let end = builder.current_offset() + line.op.encoded_len();
        let mut words = Vec::with_capacity(line.operands.len());
        for operand in &line.operands {
            let word = match operand {
                Operand::Int(n) => *n,
                Operand::Str(s) => resolver.string_constant(s) as i32,
                Operand::IntConst(n) => resolver.int_constant(*n) as i32,
                Operand::Label(name) => {
                    let target = labels.get(name).ok_or_else(|| AssembleError::UnknownLabel {
                        line: line.number,
                        label: name.clone(),
                    })?;
                    *target as i32 - end as i32
                }
                Operand::Name(name) => {
                    resolver
                        .name(line.op, name)
                        .ok_or_else(|| AssembleError::Unresolved {
                            line: line.number,
                            mnemonic: line.op.mnemonic(),
                            name: name.clone(),
                        })?
                }
            };
            words.push(word);
        }
        let found = words.len();
        let mut words = words.into_iter();
        let insn = Instruction::read(line.op, || words.next().ok_or(())).map_err(|()| {
            AssembleError::Arity {
                line: line.number,
                mnemonic: line.op.mnemonic(),
                expected: line.op.arity(),
                found,
            }
        })?;
        builder.emit(insn);
    }
    Ok(builder.into_bytes())
}

/// Assemble a method body given as one instruction per entry.
pub fn assemble_lines(
    lines: &[&str],
    resolver: &mut dyn OperandResolver,
) -> Result<Vec<u8>, AssembleError> {
    assemble(&lines.join("\n"), resolver)
}

fn tokenize(text: &str, line: usize) -> Result<Vec<Token>, AssembleError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.peek() {
            None | Some(';') => break,
            Some('"') => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        None => return Err(AssembleError::UnterminatedString { line }),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(c) => text.push(c),
                            None => return Err(AssembleError::UnterminatedString { line }),
                        },
                        Some(c) => text.push(c),
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            Some(_) => {
                let mut word = String::new();
                while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != ';') {
                    word.push(c);
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

fn parse_operand(token: Token, line: usize) -> Result<Operand, AssembleError> {
    let word = match token {
        Token::Quoted(text) => return Ok(Operand::Str(text)),
        Token::Word(word) => word,
    };
    let bad = || AssembleError::BadOperand {
        line,
        operand: word.clone(),
    };
    if let Some(rest) = word.strip_prefix('#') {
        return parse_int(rest).map(Operand::IntConst).ok_or_else(bad);
    }
    if let Some(rest) = word.strip_prefix('@') {
        return if is_identifier(rest) {
            Ok(Operand::Label(rest.to_string()))
        } else {
            Err(bad())
        };
    }
    if let Some(n) = parse_int(&word) {
        return Ok(Operand::Int(n));
    }
    if is_identifier(&word) {
        return Ok(Operand::Name(word));
    }
    Err(bad())
}

fn parse_int(text: &str) -> Option<i32> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None if digits.starts_with(|c: char| c.is_ascii_digit()) => digits.parse::<i64>().ok()?,
        None => return None,
    };
    let value = if negative { -magnitude } else { magnitude };
    // accept the full u32 range so raw addresses such as 0xFFFFFFFF fit
    if value < i32::MIN as i64 || value > u32::MAX as i64 {
        return None;
    }
    Some(value as i32)
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BytecodeDecoder;
    use crate::instruction::Condition;

    #[derive(Default)]
    struct Pool {
        strings: Vec<String>,
        ints: Vec<i32>,
    }

    impl OperandResolver for Pool {
        fn string_constant(&mut self, text: &str) -> u32 {
            self.strings.push(text.to_string());
            (self.strings.len() - 1) as u32
        }

        fn int_constant(&mut self, value: i32) -> u32 {
            self.ints.push(value);
            100 + (self.ints.len() - 1) as u32
        }

        fn name(&mut self, op: Op, name: &str) -> Option<i32> {
            match (op, name) {
                (Op::Syscall, "print") => Some(1),
                (Op::New, "Counter") => Some(7),
                _ => None,
            }
        }
    }

    fn decode(bytes: &[u8]) -> Vec<Instruction> {
        BytecodeDecoder::new(bytes).map(|r| r.unwrap()).collect()
    }

    #[test]
    fn operands_of_every_form() {
        let mut pool = Pool::default();
        let src = r#"
            ; greet
            new-str "hello, world" ; with a comma
            syscall print
            new Counter
            new-arr #3
            push-int -5
            push-arg 1 0x10
        "#;
        let bytes = assemble(src, &mut pool).unwrap();
        assert_eq!(
            decode(&bytes),
            vec![
                Instruction::NewStr { text: 0 },
                Instruction::Syscall { id: 1 },
                Instruction::New { class: 7 },
                Instruction::NewArr { length: 100 },
                Instruction::PushInt { value: -5 },
                Instruction::PushArg { index: 1, ptr: 16 },
            ]
        );
        assert_eq!(pool.strings, vec!["hello, world".to_string()]);
        assert_eq!(pool.ints, vec![3]);
    }

    #[test]
    fn labels_resolve_relative_to_instruction_end() {
        let mut pool = Pool::default();
        let src = "top:\n new-int 1\n new-int 2\n jmp-lt-int @top\n jmp @end\n halt\nend: return";
        let insns = decode(&assemble(src, &mut pool).unwrap());
        assert_eq!(insns[2], Instruction::Branch { cond: Condition::Lt, offset: -15 });
        assert_eq!(insns[3], Instruction::Jmp { offset: 1 });
        assert_eq!(insns[5], Instruction::Return);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let mut pool = Pool::default();
        assert_eq!(
            assemble("halt\nfrobnicate", &mut pool),
            Err(AssembleError::UnknownMnemonic { line: 2, mnemonic: "frobnicate".into() })
        );
        assert_eq!(
            assemble("push-int", &mut pool),
            Err(AssembleError::Arity { line: 1, mnemonic: "push-int", expected: 1, found: 0 })
        );
        assert_eq!(
            assemble("jmp @nowhere", &mut pool),
            Err(AssembleError::UnknownLabel { line: 1, label: "nowhere".into() })
        );
        assert_eq!(
            assemble("syscall launch", &mut pool),
            Err(AssembleError::Unresolved { line: 1, mnemonic: "syscall", name: "launch".into() })
        );
        assert_eq!(
            assemble("new-str \"open", &mut pool),
            Err(AssembleError::UnterminatedString { line: 1 })
        );
        assert_eq!(
            assemble("a:\na: halt", &mut pool),
            Err(AssembleError::DuplicateLabel { line: 2, label: "a".into() })
        );
        assert_eq!(
            assemble("push-int 1x", &mut pool),
            Err(AssembleError::BadOperand { line: 1, operand: "1x".into() })
        );
    }

    #[test]
    fn every_opcode_is_emitted() {
        let mut pool = Pool::default();
        let src: Vec<String> = Op::ALL
            .iter()
            .map(|op| {
                let mut line = op.mnemonic().to_string();
                for _ in 0..op.arity() {
                    line.push_str(" 2");
                }
                line
            })
            .collect();
        let src = src.join("\n");
        let insns = decode(&assemble(&src, &mut pool).unwrap());
        let ops: Vec<Op> = insns.iter().map(Instruction::op).collect();
        assert_eq!(ops, Op::ALL.to_vec());
        assert!(insns.iter().all(|insn| insn.operands().iter().all(|w| *w == 2)));
    }

    #[test]
    fn method_body_lines() {
        let mut pool = Pool::default();
        let bytes = assemble_lines(&["pop-arg 1", "pop-arg 0", "add-int", "return-top"], &mut pool)
            .unwrap();
        assert_eq!(bytes, vec![0x14, 0, 0, 0, 1, 0x14, 0, 0, 0, 0, 0x0E, 0x04]);
    }
}
