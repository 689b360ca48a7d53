//! Built-in programs for the `stackvm` binary.

use crate::bytecode::{CodeBuffer, Opcode::*};
use crate::runtime::fault::Result;

pub struct Demo {
    pub name: &'static str,
    pub about: &'static str,
    pub build: fn() -> Result<CodeBuffer>,
}

pub const DEMOS: &[Demo] = &[
    Demo {
        name: "add",
        about: "PUSH 5; PUSH 4; ADD; PRINT; STOP",
        build: add,
    },
    Demo {
        name: "countdown",
        about: "print 3, 2, 1 from a memory-backed loop",
        build: countdown,
    },
    Demo {
        name: "factorial",
        about: "5! computed in a subroutine, accumulator in memory",
        build: factorial,
    },
    Demo {
        name: "divzero",
        about: "halts with DivisionByZero",
        build: divzero,
    },
];

pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|d| d.name == name)
}

fn add() -> Result<CodeBuffer> {
    let mut c = CodeBuffer::new();
    c.emit_i32(Push, 5)
        .emit_i32(Push, 4)
        .emit(Add)
        .emit(Print)
        .emit(Stop);
    Ok(c)
}

fn countdown() -> Result<CodeBuffer> {
    const COUNTER: i32 = 0;

    let mut c = CodeBuffer::new();
    c.emit_i32(Push, 3).emit_i32(Push, COUNTER).emit(Store);

    let top = c.len() as i32;
    c.emit_i32(Push, COUNTER)
        .emit(Load)
        .emit(Dup)
        .emit(Print)
        .emit_i32(Push, 1)
        .emit(Sub)
        .emit(Dup)
        .emit_i32(Push, COUNTER)
        .emit(Store)
        .emit_i32(Jnz, top)
        .emit(Stop);
    Ok(c)
}

fn factorial() -> Result<CodeBuffer> {
    const N: i32 = 0;
    const ACC: i32 = 1;

    let mut c = CodeBuffer::new();
    c.emit_i32(Push, 1).emit_i32(Push, ACC).emit(Store);
    c.emit_i32(Push, 5).emit_i32(Push, N).emit(Store);

    let call = c.len();
    c.emit_i32(Call, 0);
    c.emit_i32(Push, ACC).emit(Load).emit(Print).emit(Stop);

    // while n != 0 { acc *= n; n -= 1 }
    let sub = c.len();
    c.patch_i32(call + 1, sub as i32)?;
    c.emit_i32(Push, N).emit(Load);
    let exit = c.len();
    c.emit_i32(Jz, 0);
    c.emit_i32(Push, ACC)
        .emit(Load)
        .emit_i32(Push, N)
        .emit(Load)
        .emit(Mul)
        .emit_i32(Push, ACC)
        .emit(Store);
    c.emit_i32(Push, N)
        .emit(Load)
        .emit_i32(Push, 1)
        .emit(Sub)
        .emit_i32(Push, N)
        .emit(Store);
    c.emit_i32(Jmp, sub as i32);

    let ret = c.len();
    c.patch_i32(exit + 1, ret as i32)?;
    c.emit(Ret);
    Ok(c)
}

fn divzero() -> Result<CodeBuffer> {
    let mut c = CodeBuffer::new();
    c.emit_i32(Push, 1).emit_i32(Push, 0).emit(Div).emit(Print);
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::verify::check_code;
    use crate::runtime::{Fault, Interpreter, Outcome, VmConfig};

    fn run(name: &str) -> (Outcome, String) {
        let code = (find(name).expect("demo exists").build)().expect("demo builds");
        let mut vm = Interpreter::with_output(&code, VmConfig::default(), Vec::new());
        let outcome = vm.run();
        (outcome, String::from_utf8(vm.into_output()).unwrap())
    }

    #[test]
    fn test_demo_outputs() {
        assert_eq!(run("add"), (Outcome::Normal, "9\n".to_string()));
        assert_eq!(run("countdown"), (Outcome::Normal, "3\n2\n1\n".to_string()));
        assert_eq!(run("factorial"), (Outcome::Normal, "120\n".to_string()));
        assert_eq!(
            run("divzero"),
            (Outcome::Fault(Fault::DivisionByZero), String::new())
        );
    }

    #[test]
    fn test_all_demos_verify() {
        for demo in DEMOS {
            let code = (demo.build)().unwrap();
            assert_eq!(check_code(&code), Ok(()), "{}", demo.name);
        }
    }

    #[test]
    fn test_unknown_demo() {
        assert!(find("nope").is_none());
    }
}
