//! Validation and repair of Type 2 CharStrings.
//!
//! Programs are not executed. The validator tracks the depth of the operand stack closely enough
//! to check operator preconditions, find the advance width and rewrite constructs that
//! downstream font sanitizers reject. Refer to Adobe Technical Note #5177.

use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

use super::dict::{Operator, PrivateDict};
use super::fd_select::FDSelect;
use super::index::Index;
use super::FontDict;
use crate::error::CharStringError;

mod argstack;

pub use argstack::ArgumentsStack;

// Limits according to the Adobe Technical Note #5177 Appendix B.
pub(crate) const STACK_LIMIT: usize = 10;

pub(crate) const TWO_BYTE_OPERATOR_MARK: u8 = 12;

/// `0 endchar`, the program that replaces rejected or empty glyphs.
pub(crate) const ENDCHAR_PROGRAM: [u8; 2] = [0x8b, operator::ENDCHAR];

/// Operands of a `seac`-like `endchar`: an accented glyph built from two standard encoding codes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Seac {
    pub adx: f64,
    pub ady: f64,
    pub base_char: f64,
    pub accent_char: f64,
}

/// Per glyph results of validating the CharStrings INDEX.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharStringMetrics {
    pub widths: Vec<f64>,
    pub seacs: Vec<Option<Seac>>,
}

/// Font DICTs selected per glyph in CID-keyed fonts.
pub(crate) struct FontDictSelect<'a> {
    pub(crate) fd_select: &'a FDSelect,
    pub(crate) fd_array: &'a mut [FontDict],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Outcome {
    Complete,
    Seac,
}

#[derive(Copy, Clone)]
enum StackEffect {
    /// The operator consumes the whole stack. The first one may be preceded by the width.
    Clear,
    /// Path construction: consumes the stack and makes its depth known again.
    Reset,
    /// Arithmetic and storage: changes the depth by a fixed amount, some compute their result.
    Adjust(isize, Option<fn(&mut ArgumentsStack)>),
}

#[derive(Copy, Clone)]
struct Command {
    name: &'static str,
    min: usize,
    stem: bool,
    effect: StackEffect,
}

impl Command {
    const fn stem(name: &'static str) -> Self {
        Command {
            name,
            min: 2,
            stem: true,
            effect: StackEffect::Clear,
        }
    }

    const fn clearing(name: &'static str, min: usize) -> Self {
        Command {
            name,
            min,
            stem: false,
            effect: StackEffect::Clear,
        }
    }

    const fn path(name: &'static str, min: usize) -> Self {
        Command {
            name,
            min,
            stem: false,
            effect: StackEffect::Reset,
        }
    }

    const fn adjust(
        name: &'static str,
        min: usize,
        delta: isize,
        apply: Option<fn(&mut ArgumentsStack)>,
    ) -> Self {
        Command {
            name,
            min,
            stem: false,
            effect: StackEffect::Adjust(delta, apply),
        }
    }
}

fn command(op: u8) -> Option<Command> {
    use operator::*;

    let command = match op {
        HORIZONTAL_STEM => Command::stem("hstem"),
        VERTICAL_STEM => Command::stem("vstem"),
        VERTICAL_MOVE_TO => Command::clearing("vmoveto", 1),
        LINE_TO => Command::path("rlineto", 2),
        HORIZONTAL_LINE_TO => Command::path("hlineto", 1),
        VERTICAL_LINE_TO => Command::path("vlineto", 1),
        CURVE_TO => Command::path("rrcurveto", 6),
        ENDCHAR => Command::clearing("endchar", 0),
        HORIZONTAL_STEM_HINT_MASK => Command::stem("hstemhm"),
        HINT_MASK => Command::clearing("hintmask", 0),
        COUNTER_MASK => Command::clearing("cntrmask", 0),
        MOVE_TO => Command::clearing("rmoveto", 2),
        HORIZONTAL_MOVE_TO => Command::clearing("hmoveto", 1),
        VERTICAL_STEM_HINT_MASK => Command::stem("vstemhm"),
        CURVE_LINE => Command::path("rcurveline", 8),
        LINE_CURVE => Command::path("rlinecurve", 8),
        VV_CURVE_TO => Command::path("vvcurveto", 4),
        HH_CURVE_TO => Command::path("hhcurveto", 4),
        VH_CURVE_TO => Command::path("vhcurveto", 4),
        HV_CURVE_TO => Command::path("hvcurveto", 4),
        _ => return None,
    };
    Some(command)
}

fn escaped_command(op: u8) -> Option<Command> {
    use operator::*;

    let command = match op {
        AND => Command::adjust("and", 2, -1, None),
        OR => Command::adjust("or", 2, -1, None),
        NOT => Command::adjust("not", 1, 0, None),
        ABS => Command::adjust("abs", 1, 0, None),
        ADD => Command::adjust("add", 2, -1, Some(add)),
        SUB => Command::adjust("sub", 2, -1, Some(sub)),
        DIV => Command::adjust("div", 2, -1, Some(div)),
        NEG => Command::adjust("neg", 1, 0, Some(neg)),
        EQ => Command::adjust("eq", 2, -1, None),
        DROP => Command::adjust("drop", 1, -1, None),
        PUT => Command::adjust("put", 2, -2, None),
        GET => Command::adjust("get", 1, 0, None),
        IFELSE => Command::adjust("ifelse", 4, -3, None),
        RANDOM => Command::adjust("random", 0, 1, None),
        MUL => Command::adjust("mul", 2, -1, Some(mul)),
        SQRT => Command::adjust("sqrt", 1, 0, None),
        DUP => Command::adjust("dup", 1, 1, None),
        EXCH => Command::adjust("exch", 2, 0, None),
        INDEX => Command::adjust("index", 2, 0, None),
        ROLL => Command::adjust("roll", 3, -2, None),
        HFLEX => Command::path("hflex", 7),
        FLEX => Command::path("flex", 13),
        HFLEX1 => Command::path("hflex1", 9),
        FLEX1 => Command::path("flex1", 11),
        _ => return None,
    };
    Some(command)
}

fn binary_op(stack: &mut ArgumentsStack, f: impl Fn(f64, f64) -> f64) {
    let Some(&[a, b]) = stack.top(2) else {
        return;
    };
    stack.set_from_top(2, f(a, b));
}

fn add(stack: &mut ArgumentsStack) {
    binary_op(stack, |a, b| a + b)
}

fn sub(stack: &mut ArgumentsStack) {
    binary_op(stack, |a, b| a - b)
}

fn div(stack: &mut ArgumentsStack) {
    binary_op(stack, |a, b| a / b)
}

fn mul(stack: &mut ArgumentsStack) {
    binary_op(stack, |a, b| a * b)
}

fn neg(stack: &mut ArgumentsStack) {
    if let Some(&[a]) = stack.top(1) {
        stack.set_from_top(1, -a);
    }
}

/// Interpreter state for one glyph, shared by every subroutine it calls.
struct CharStringState {
    stack: ArgumentsStack,
    call_depth: usize,
    hints: usize,
    first_stack_clearing: bool,
    /// Set until the first path construction operator, the stack depth is not trusted before it.
    undefined_stack: bool,
    has_vstems: bool,
    width: Option<f64>,
    seac: Option<Seac>,
    seac_analysis: bool,
}

impl CharStringState {
    fn new(seac_analysis: bool) -> Self {
        CharStringState {
            stack: ArgumentsStack::new(),
            call_depth: 0,
            hints: 0,
            first_stack_clearing: true,
            undefined_stack: true,
            has_vstems: false,
            width: None,
            seac: None,
            seac_analysis,
        }
    }

    fn validate(
        &mut self,
        program: &mut [u8],
        mut local_subrs: Option<&mut Index>,
        global_subrs: &mut Index,
    ) -> Result<Outcome, CharStringError> {
        use operator::*;

        if self.call_depth > STACK_LIMIT {
            return Err(CharStringError::NestingLimitReached);
        }

        let mut j = 0;
        while j < program.len() {
            let op = program[j];
            j += 1;

            let command = match op {
                TWO_BYTE_OPERATOR_MARK => {
                    let Some(&op2) = program.get(j) else {
                        break;
                    };
                    j += 1;
                    if op2 == DOTSECTION {
                        // Deprecated no-op, replaced by `0 hmoveto` which is understood everywhere
                        program[j - 2] = 139;
                        program[j - 1] = HORIZONTAL_MOVE_TO;
                        self.stack.clear();
                        continue;
                    }
                    escaped_command(op2)
                }
                SHORT_INT => {
                    let Some(bytes) = program.get(j..j + 2) else {
                        break;
                    };
                    self.stack.push(f64::from(BigEndian::read_i16(bytes)));
                    j += 2;
                    continue;
                }
                ENDCHAR => {
                    if let Some(&[adx, ady, base_char, accent_char]) = self.stack.top(4) {
                        self.stack.set_len(self.stack.len() - 4);
                        if self.seac_analysis {
                            self.seac = Some(Seac {
                                adx,
                                ady,
                                base_char,
                                accent_char,
                            });
                            return Ok(Outcome::Seac);
                        }
                    }
                    command(op)
                }
                32..=246 => {
                    self.stack.push(f64::from(i32::from(op) - 139));
                    continue;
                }
                247..=254 => {
                    let Some(&b1) = program.get(j) else {
                        break;
                    };
                    j += 1;
                    let value = if op < 251 {
                        (i32::from(op) - 247) * 256 + i32::from(b1) + 108
                    } else {
                        -(i32::from(op) - 251) * 256 - i32::from(b1) - 108
                    };
                    self.stack.push(f64::from(value));
                    continue;
                }
                FIXED_16_16 => {
                    let Some(bytes) = program.get(j..j + 4) else {
                        break;
                    };
                    self.stack
                        .push(f64::from(BigEndian::read_i32(bytes)) / 65536.0);
                    j += 4;
                    continue;
                }
                HINT_MASK | COUNTER_MASK => {
                    self.hints += self.stack.len() >> 1;
                    // Skip the mask bytes, one bit per hint
                    j += (self.hints + 7) >> 3;
                    self.stack.set_len(self.stack.len() % 2);
                    command(op)
                }
                CALL_LOCAL_SUBROUTINE | CALL_GLOBAL_SUBROUTINE => {
                    let local = op == CALL_LOCAL_SUBROUTINE;
                    let name = if local { "callsubr" } else { "callgsubr" };
                    let (subr_index, mut subr) = {
                        let subrs: &Index = if local {
                            match local_subrs.as_deref() {
                                Some(subrs) => subrs,
                                None => {
                                    warn!("Missing subrsIndex for {}", name);
                                    return Err(CharStringError::MissingSubroutines);
                                }
                            }
                        } else {
                            &*global_subrs
                        };
                        let bias = calc_subroutine_bias(subrs.count());
                        let subr = self
                            .stack
                            .pop()
                            .and_then(|index| conv_subroutine_index(index, bias))
                            .and_then(|index| Some((index, subrs.get(index)?.to_vec())));
                        match subr {
                            Some(subr) => subr,
                            None => {
                                warn!("Out of bounds subrIndex for {}", name);
                                return Err(CharStringError::InvalidSubroutineIndex);
                            }
                        }
                    };

                    self.call_depth += 1;
                    let outcome = self.validate(&mut subr, local_subrs.as_deref_mut(), global_subrs)?;
                    if local {
                        if let Some(subrs) = local_subrs.as_deref_mut() {
                            subrs.set(subr_index, subr);
                        }
                    } else {
                        global_subrs.set(subr_index, subr);
                    }
                    if outcome == Outcome::Seac {
                        return Ok(outcome);
                    }
                    self.call_depth -= 1;
                    continue;
                }
                RETURN => return Ok(Outcome::Complete),
                0 if j == program.len() => {
                    // A trailing reserved operator is taken as a terminator
                    program[j - 1] = ENDCHAR;
                    command(ENDCHAR)
                }
                _ => command(op),
            };

            let Some(command) = command else {
                continue;
            };

            if command.stem {
                self.hints += self.stack.len() >> 1;
                if op == VERTICAL_STEM || op == VERTICAL_STEM_HINT_MASK {
                    self.has_vstems = true;
                } else if self.has_vstems {
                    // Vertical stems must not come first in the reordered program
                    warn!("CFF stem hints are in wrong order");
                    program[j - 1] = if op == HORIZONTAL_STEM {
                        VERTICAL_STEM
                    } else {
                        VERTICAL_STEM_HINT_MASK
                    };
                }
            }

            let len = self.stack.len();
            if !self.undefined_stack && len < command.min {
                warn!(
                    "Not enough parameters for {}; actual: {}, expected: {}",
                    command.name, len, command.min
                );
                if len == 0 {
                    if let Some(byte) = program.get_mut(j - 1) {
                        *byte = ENDCHAR;
                    }
                    return Ok(Outcome::Complete);
                }
                return Err(CharStringError::InsufficientArguments);
            }

            if self.first_stack_clearing && matches!(command.effect, StackEffect::Clear) {
                self.first_stack_clearing = false;
                let mut remaining = len.saturating_sub(command.min);
                if remaining >= 2 && command.stem {
                    remaining %= 2;
                } else if remaining > 1 {
                    warn!("Found too many parameters for stack-clearing command");
                }
                if remaining > 0 {
                    self.width = Some(self.stack.at(remaining - 1));
                }
            }

            match command.effect {
                StackEffect::Clear => self.stack.clear(),
                StackEffect::Reset => {
                    self.stack.clear();
                    self.undefined_stack = false;
                }
                StackEffect::Adjust(delta, apply) => {
                    if let Some(apply) = apply {
                        apply(&mut self.stack);
                    }
                    self.stack
                        .set_len(len.checked_add_signed(delta).unwrap_or(0));
                }
            }
        }

        Ok(Outcome::Complete)
    }
}

/// Validate every glyph program, repairing what can be repaired.
///
/// Rejected programs are replaced with [ENDCHAR_PROGRAM]. Local and global subroutines are
/// rewritten in place when validation repairs them.
pub(crate) fn validate_char_strings(
    char_strings: &mut Index,
    global_subrs: &mut Index,
    mut private: Option<&mut PrivateDict>,
    mut font_dicts: Option<FontDictSelect<'_>>,
    seac_analysis: bool,
) -> CharStringMetrics {
    let count = char_strings.count();
    let mut metrics = CharStringMetrics {
        widths: Vec::with_capacity(count),
        seacs: Vec::with_capacity(count),
    };

    for glyph_id in 0..count {
        let mut valid = Ok(());
        let glyph_private = match font_dicts.as_mut() {
            Some(FontDictSelect { fd_select, fd_array }) if !fd_array.is_empty() => {
                match fd_select.font_dict_index(glyph_id) {
                    Some(fd_index) => match fd_array.get_mut(usize::from(fd_index)) {
                        Some(font_dict) => font_dict.private.as_mut(),
                        None => {
                            warn!("Invalid fd index for glyph index.");
                            valid = Err(CharStringError::InvalidFontDict);
                            private.as_deref_mut()
                        }
                    },
                    None => {
                        warn!("Glyph index is not in fd select.");
                        valid = Err(CharStringError::InvalidFontDict);
                        private.as_deref_mut()
                    }
                }
            }
            _ => private.as_deref_mut(),
        };

        let (nominal_width, default_width, local_subrs) = match glyph_private {
            Some(PrivateDict { dict, subrs }) => (
                dict.get_number(Operator::NominalWidthX).unwrap_or(0.0),
                dict.get_number(Operator::DefaultWidthX).unwrap_or(0.0),
                subrs.as_mut(),
            ),
            None => (0.0, 0.0, None),
        };

        let mut program = char_strings
            .get(glyph_id)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        let mut state = CharStringState::new(seac_analysis);
        let result = valid.and_then(|()| state.validate(&mut program, local_subrs, global_subrs));

        metrics.widths.push(match state.width {
            Some(width) => nominal_width + width,
            None => default_width,
        });
        metrics.seacs.push(state.seac);

        match result {
            Ok(_) => char_strings.set(glyph_id, program),
            Err(err) => {
                debug!("glyph {}: {}", glyph_id, err);
                char_strings.set(glyph_id, ENDCHAR_PROGRAM.to_vec());
            }
        }
    }

    metrics
}

/// Apply `bias` to a subroutine operand, rejecting values that are not a whole index.
pub(crate) fn conv_subroutine_index(index: f64, bias: u16) -> Option<usize> {
    let index = index + f64::from(bias);
    if index.fract() != 0.0 || index < 0.0 || index > f64::from(u32::MAX) {
        return None;
    }
    usize::try_from(index as u32).ok()
}

// Adobe Technical Note #5176, Chapter 16 "Local / Global Subrs INDEXes"
pub(crate) fn calc_subroutine_bias(len: usize) -> u16 {
    if len < 1240 {
        107
    } else if len < 33900 {
        1131
    } else {
        32768
    }
}

pub(crate) mod operator {
    pub const HORIZONTAL_STEM: u8 = 1;
    pub const VERTICAL_STEM: u8 = 3;
    pub const VERTICAL_MOVE_TO: u8 = 4;
    pub const LINE_TO: u8 = 5;
    pub const HORIZONTAL_LINE_TO: u8 = 6;
    pub const VERTICAL_LINE_TO: u8 = 7;
    pub const CURVE_TO: u8 = 8;
    pub const CALL_LOCAL_SUBROUTINE: u8 = 10;
    pub const RETURN: u8 = 11;
    pub const ENDCHAR: u8 = 14;
    pub const HORIZONTAL_STEM_HINT_MASK: u8 = 18;
    pub const HINT_MASK: u8 = 19;
    pub const COUNTER_MASK: u8 = 20;
    pub const MOVE_TO: u8 = 21;
    pub const HORIZONTAL_MOVE_TO: u8 = 22;
    pub const VERTICAL_STEM_HINT_MASK: u8 = 23;
    pub const CURVE_LINE: u8 = 24;
    pub const LINE_CURVE: u8 = 25;
    pub const VV_CURVE_TO: u8 = 26;
    pub const HH_CURVE_TO: u8 = 27;
    pub const SHORT_INT: u8 = 28;
    pub const CALL_GLOBAL_SUBROUTINE: u8 = 29;
    pub const VH_CURVE_TO: u8 = 30;
    pub const HV_CURVE_TO: u8 = 31;
    pub const FIXED_16_16: u8 = 255;

    // Second byte of two byte operators
    pub const DOTSECTION: u8 = 0;
    pub const AND: u8 = 3;
    pub const OR: u8 = 4;
    pub const NOT: u8 = 5;
    pub const ABS: u8 = 9;
    pub const ADD: u8 = 10;
    pub const SUB: u8 = 11;
    pub const DIV: u8 = 12;
    pub const NEG: u8 = 14;
    pub const EQ: u8 = 15;
    pub const DROP: u8 = 18;
    pub const PUT: u8 = 20;
    pub const GET: u8 = 21;
    pub const IFELSE: u8 = 22;
    pub const RANDOM: u8 = 23;
    pub const MUL: u8 = 24;
    pub const SQRT: u8 = 26;
    pub const DUP: u8 = 27;
    pub const EXCH: u8 = 28;
    pub const INDEX: u8 = 29;
    pub const ROLL: u8 = 30;
    pub const HFLEX: u8 = 34;
    pub const FLEX: u8 = 35;
    pub const HFLEX1: u8 = 36;
    pub const FLEX1: u8 = 37;
}
