use crate::chunk::{Chunk, OpCode};

/// Renders a whole chunk under a `== name ==` header, one instruction per line.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);
    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Renders the instruction at `offset` and returns it with the offset of the
/// next instruction. Never reads past the end of the chunk and always makes
/// progress, so corrupt bytecode cannot stall a listing.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = format!("{:04} ", offset);

    match (offset.checked_sub(1).and_then(|prev| chunk.line(prev)), chunk.line(offset)) {
        (Some(prev), Some(line)) if prev == line => out.push_str("   | "),
        (_, Some(line)) => out.push_str(&format!("{:>4} ", line)),
        (_, None) => out.push_str("   ? "),
    }

    let Some(&byte) = chunk.code().get(offset) else {
        out.push_str("<end of chunk>");
        return (out, offset + 1);
    };

    match OpCode::try_from(byte) {
        Ok(OpCode::Constant) => {
            let next = constant_instruction(chunk, offset, &mut out);
            (out, next)
        }
        Ok(op) => {
            out.push_str(op.mnemonic());
            (out, offset + 1 + op.operand_len())
        }
        Err(_) => {
            out.push_str(&format!("Unknown opcode {}", byte));
            (out, offset + 1)
        }
    }
}

fn constant_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let name = OpCode::Constant.mnemonic();
    let Some(&index) = chunk.code().get(offset + 1) else {
        out.push_str(&format!("{} <truncated>", name));
        return offset + 1;
    };
    match chunk.constant(index) {
        Some(value) => out.push_str(&format!("{:<16} {:>4} '{}'", name, index, value)),
        None => out.push_str(&format!("{:<16} {:>4} <missing constant>", name, index)),
    }
    offset + 1 + OpCode::Constant.operand_len()
}
