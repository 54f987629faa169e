use super::Index;
use crate::disasm::{Eval, Statement};
use crate::text::{x16, x8};

const R: [&str; 8] = ["b", "c", "d", "e", "h", "l", "(hl)", "a"];
const RP: [&str; 4] = ["bc", "de", "hl", "sp"];
const RP2: [&str; 4] = ["bc", "de", "hl", "af"];
const CC: [&str; 8] = ["nz", "z", "nc", "c", "po", "pe", "p", "m"];
const ALU: [&str; 8] = ["add", "adc", "sub", "sbc", "and", "xor", "or", "cp"];
const ROT: [&str; 8] = ["rlc", "rrc", "rl", "rr", "sla", "sra", "sll", "srl"];
const ACC: [&str; 8] = ["rlca", "rrca", "rla", "rra", "daa", "cpl", "scf", "ccf"];
const IM: [&str; 8] = ["0", "0", "1", "2", "0", "0", "1", "2"];
const BLOCK: [[&str; 4]; 4] = [
    ["ldi", "cpi", "ini", "outi"],
    ["ldd", "cpd", "ind", "outd"],
    ["ldir", "cpir", "inir", "otir"],
    ["lddr", "cpdr", "indr", "otdr"],
];

/// Decodes one Z80 instruction, following `cb`, `dd`, `ed` and `fd`
/// prefixes.
pub fn list(eval: &mut Eval<'_>) -> Statement {
    let op = eval.fetch();
    let (name, operands) = match op {
        0xcb => cb(eval, Index::Hl),
        0xed => ed(eval),
        0xdd | 0xfd => {
            let idx = if op == 0xdd { Index::Ix } else { Index::Iy };
            if matches!(eval.peek(), 0xdd | 0xed | 0xfd) {
                (format!("?{op:02x}"), String::new())
            } else {
                let next = eval.fetch();
                if next == 0xcb {
                    cb(eval, idx)
                } else if uses_hl(next) {
                    unprefixed(eval, next, idx)
                } else {
                    (format!("?{op:02x}{next:02x}"), String::new())
                }
            }
        }
        _ => unprefixed(eval, op, Index::Hl),
    };
    eval.finish(name, operands)
}

/// Returns `true` when an index prefix changes the meaning of `op`.
const fn uses_hl(op: u8) -> bool {
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    match x {
        0 => match z {
            1 => p == 2 || y & 1 == 1,
            2 | 3 => p == 2,
            4..=6 => y >= 4 && y <= 6,
            _ => false,
        },
        1 => op != 0x76 && ((y >= 4 && y <= 6) || (z >= 4 && z <= 6)),
        2 => z >= 4 && z <= 6,
        _ => matches!(op, 0xe1 | 0xe3 | 0xe5 | 0xe9 | 0xf9),
    }
}

const fn pair_name(idx: Index) -> &'static str {
    match idx {
        Index::Hl => "hl",
        Index::Ix => "ix",
        Index::Iy => "iy",
    }
}

fn indirect(eval: &mut Eval<'_>, idx: Index) -> String {
    if idx == Index::Hl {
        return "(hl)".to_owned();
    }
    let disp = i8::from_le_bytes([eval.fetch()]);
    let sign = if disp < 0 { '-' } else { '+' };
    format!("({}{sign}{})", pair_name(idx), x8(disp.unsigned_abs()))
}

fn reg(eval: &mut Eval<'_>, n: u8, idx: Index, halves: bool) -> String {
    match (n, halves, idx) {
        (6, _, _) => indirect(eval, idx),
        (4 | 5, true, Index::Ix | Index::Iy) => {
            let half = if n == 4 { 'h' } else { 'l' };
            format!("{}{half}", pair_name(idx))
        }
        _ => R[usize::from(n)].to_owned(),
    }
}

fn pair(p: u8, idx: Index) -> &'static str {
    if p == 2 {
        pair_name(idx)
    } else {
        RP[usize::from(p)]
    }
}

fn relative(eval: &mut Eval<'_>) -> String {
    let disp = i16::from(i8::from_le_bytes([eval.fetch()]));
    let next = u16::try_from(eval.pc() & 0xffff).unwrap_or(0);
    x16(next.wrapping_add_signed(disp))
}

fn alu(y: u8, operand: &str) -> (String, String) {
    let name = ALU[usize::from(y)];
    let operands = match y {
        0 | 1 | 3 => format!("a,{operand}"),
        _ => operand.to_owned(),
    };
    (name.to_owned(), operands)
}

fn op(name: &str, operands: impl Into<String>) -> (String, String) {
    (name.to_owned(), operands.into())
}

#[allow(clippy::too_many_lines)]
fn unprefixed(eval: &mut Eval<'_>, code: u8, idx: Index) -> (String, String) {
    let x = code >> 6;
    let y = (code >> 3) & 7;
    let z = code & 7;
    let p = y >> 1;
    let q = y & 1;
    let hl = pair_name(idx);
    match (x, z) {
        (0, 0) => match y {
            0 => op("nop", ""),
            1 => op("ex", "af,af'"),
            2 => op("djnz", relative(eval)),
            3 => op("jr", relative(eval)),
            _ => {
                let target = relative(eval);
                op("jr", format!("{},{target}", CC[usize::from(y - 4)]))
            }
        },
        (0, 1) => {
            if q == 0 {
                op("ld", format!("{},{}", pair(p, idx), x16(eval.fetch16())))
            } else {
                op("add", format!("{hl},{}", pair(p, idx)))
            }
        }
        (0, 2) => match (q, p) {
            (0, 0) => op("ld", "(bc),a"),
            (0, 1) => op("ld", "(de),a"),
            (0, 2) => op("ld", format!("({}),{hl}", x16(eval.fetch16()))),
            (0, _) => op("ld", format!("({}),a", x16(eval.fetch16()))),
            (_, 0) => op("ld", "a,(bc)"),
            (_, 1) => op("ld", "a,(de)"),
            (_, 2) => op("ld", format!("{hl},({})", x16(eval.fetch16()))),
            _ => op("ld", format!("a,({})", x16(eval.fetch16()))),
        },
        (0, 3) => op(if q == 0 { "inc" } else { "dec" }, pair(p, idx)),
        (0, 4) => op("inc", reg(eval, y, idx, true)),
        (0, 5) => op("dec", reg(eval, y, idx, true)),
        (0, 6) => {
            let dst = reg(eval, y, idx, true);
            op("ld", format!("{dst},{}", x8(eval.fetch())))
        }
        (0, _) => op(ACC[usize::from(y)], ""),
        (1, 6) if y == 6 => op("halt", ""),
        (1, _) => {
            let halves = y != 6 && z != 6;
            let dst = reg(eval, y, idx, halves);
            let src = reg(eval, z, idx, halves);
            op("ld", format!("{dst},{src}"))
        }
        (2, _) => {
            let src = reg(eval, z, idx, true);
            alu(y, &src)
        }
        (_, 0) => op("ret", CC[usize::from(y)]),
        (_, 1) => match (q, p) {
            (0, _) => op("pop", if p == 2 { hl } else { RP2[usize::from(p)] }),
            (_, 0) => op("ret", ""),
            (_, 1) => op("exx", ""),
            (_, 2) => op("jp", format!("({hl})")),
            _ => op("ld", format!("sp,{hl}")),
        },
        (_, 2) => op(
            "jp",
            format!("{},{}", CC[usize::from(y)], x16(eval.fetch16())),
        ),
        (_, 3) => match y {
            0 => op("jp", x16(eval.fetch16())),
            2 => op("out", format!("({}),a", x8(eval.fetch()))),
            3 => op("in", format!("a,({})", x8(eval.fetch()))),
            4 => op("ex", format!("(sp),{hl}")),
            5 => op("ex", "de,hl"),
            6 => op("di", ""),
            7 => op("ei", ""),
            _ => (format!("?{code:02x}"), String::new()),
        },
        (_, 4) => op(
            "call",
            format!("{},{}", CC[usize::from(y)], x16(eval.fetch16())),
        ),
        (_, 5) => match (q, p) {
            (0, _) => op("push", if p == 2 { hl } else { RP2[usize::from(p)] }),
            (_, 0) => op("call", x16(eval.fetch16())),
            _ => (format!("?{code:02x}"), String::new()),
        },
        (_, 6) => alu(y, &x8(eval.fetch())),
        _ => op("rst", x8(y * 8)),
    }
}

fn cb(eval: &mut Eval<'_>, idx: Index) -> (String, String) {
    let (target, code) = if idx == Index::Hl {
        let code = eval.fetch();
        (R[usize::from(code & 7)].to_owned(), code)
    } else {
        let target = indirect(eval, idx);
        (target, eval.fetch())
    };
    let y = (code >> 3) & 7;
    let z = usize::from(code & 7);
    // Indexed forms other than bit also store the result in a register.
    let copy = if idx != Index::Hl && z != 6 {
        format!(",{}", R[z])
    } else {
        String::new()
    };
    match code >> 6 {
        0 => op(ROT[usize::from(y)], format!("{target}{copy}")),
        1 => op("bit", format!("{y},{target}")),
        2 => op("res", format!("{y},{target}{copy}")),
        _ => op("set", format!("{y},{target}{copy}")),
    }
}

fn ed(eval: &mut Eval<'_>) -> (String, String) {
    let code = eval.fetch();
    let x = code >> 6;
    let y = (code >> 3) & 7;
    let z = code & 7;
    let p = y >> 1;
    let q = y & 1;
    let r = R[usize::from(y)];
    let rp = RP[usize::from(p)];
    match (x, z) {
        (1, 0) if y == 6 => op("in", "(c)"),
        (1, 0) => op("in", format!("{r},(c)")),
        (1, 1) if y == 6 => op("out", "(c),0"),
        (1, 1) => op("out", format!("(c),{r}")),
        (1, 2) => op(if q == 0 { "sbc" } else { "adc" }, format!("hl,{rp}")),
        (1, 3) => {
            let nn = x16(eval.fetch16());
            if q == 0 {
                op("ld", format!("({nn}),{rp}"))
            } else {
                op("ld", format!("{rp},({nn})"))
            }
        }
        (1, 4) => op("neg", ""),
        (1, 5) => op(if y == 1 { "reti" } else { "retn" }, ""),
        (1, 6) => op("im", IM[usize::from(y)]),
        (1, 7) if y < 6 => match y {
            0 => op("ld", "i,a"),
            1 => op("ld", "r,a"),
            2 => op("ld", "a,i"),
            3 => op("ld", "a,r"),
            4 => op("rrd", ""),
            _ => op("rld", ""),
        },
        (2, 0..=3) if y >= 4 => op(BLOCK[usize::from(y - 4)][usize::from(z)], ""),
        _ => (format!("?ed{code:02x}"), String::new()),
    }
}
