use crate::engine::{ParameterTuple, Signature};
use crate::traits::{HasSignature, RecurrenceFunction, Scalar};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

/// Deepest evaluation stack a compiled expression may need.
pub const MAX_STACK_DEPTH: usize = 32;

/// Deepest expression tree the parser will build.
pub const MAX_NESTING: usize = 256;

/// OpCodes for the stack-based virtual machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant.
    LoadConst(f64),
    /// Pushes a state variable by index (0 = x, 1 = y).
    LoadVar(usize),
    /// Pushes a parameter by tuple slot.
    LoadParam(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    /// Pops top value (a), pushes sin(a).
    Sin,
    /// Pops top value (a), pushes cos(a).
    Cos,
    /// Pops top value (a), pushes tan(a).
    Tan,
    /// Pops top value (a), pushes exp(a).
    Exp,
    /// Pops top value (a), pushes the natural log of a.
    Ln,
    /// Pops top value (a), pushes sqrt(a).
    Sqrt,
    /// Pops top value (a), pushes |a|.
    Abs,
    /// Pops top value (a), pushes its sign, with sgn(0) = 0.
    Sgn,
    /// Pops top value (a), pushes -a.
    Neg,
}

/// A compiled expression plus the stack depth it needs. Only the compiler
/// builds one, so the ops are always balanced.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    ops: Vec<OpCode>,
    depth: usize,
}

impl Bytecode {
    pub fn ops(&self) -> &[OpCode] {
        &self.ops
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn from_ops(ops: Vec<OpCode>) -> Result<Self> {
        let mut height = 0usize;
        let mut depth = 0usize;
        for op in &ops {
            match op {
                OpCode::LoadConst(_) | OpCode::LoadVar(_) | OpCode::LoadParam(_) => height += 1,
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                    if height < 2 {
                        bail!("Malformed bytecode: binary operator on short stack.");
                    }
                    height -= 1;
                }
                _ => {
                    if height < 1 {
                        bail!("Malformed bytecode: unary operator on empty stack.");
                    }
                }
            }
            depth = depth.max(height);
        }
        if height != 1 {
            bail!("Malformed bytecode: expression leaves {height} values on the stack.");
        }
        if depth > MAX_STACK_DEPTH {
            bail!("Expression nests too deeply ({depth} > {MAX_STACK_DEPTH} stack slots).");
        }
        Ok(Self { ops, depth })
    }
}

/// Stateless evaluator for [`Bytecode`].
pub(crate) struct VM;

impl VM {
    /// Runs `bytecode` against `vars` and `params`, using `stack` as scratch.
    /// `stack` must hold at least `bytecode.depth` slots.
    #[inline]
    pub(crate) fn execute<T: Scalar>(
        bytecode: &Bytecode,
        vars: &[T],
        params: &[T],
        stack: &mut [T],
    ) -> T {
        let mut sp = 0usize;

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => {
                    stack[sp] = T::from_f64(val).unwrap_or_else(T::nan);
                    sp += 1;
                }
                OpCode::LoadVar(idx) => {
                    stack[sp] = vars[idx];
                    sp += 1;
                }
                OpCode::LoadParam(idx) => {
                    stack[sp] = params[idx];
                    sp += 1;
                }
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                    sp -= 1;
                    let b = stack[sp];
                    let a = stack[sp - 1];
                    stack[sp - 1] = match *op {
                        OpCode::Add => a + b,
                        OpCode::Sub => a - b,
                        OpCode::Mul => a * b,
                        OpCode::Div => a / b,
                        _ => a.powf(b),
                    };
                }
                unary => {
                    let a = stack[sp - 1];
                    stack[sp - 1] = match unary {
                        OpCode::Sin => a.sin(),
                        OpCode::Cos => a.cos(),
                        OpCode::Tan => a.tan(),
                        OpCode::Exp => a.exp(),
                        OpCode::Ln => a.ln(),
                        OpCode::Sqrt => a.sqrt(),
                        OpCode::Abs => a.abs(),
                        OpCode::Sgn => sgn(a),
                        _ => -a,
                    };
                }
            }
        }

        stack[0]
    }
}

fn sgn<T: Scalar>(a: T) -> T {
    if a > T::zero() {
        T::one()
    } else if a < T::zero() {
        -T::one()
    } else {
        // Zero stays zero, NaN stays NaN.
        a
    }
}

// --- AST & Parser ---

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>),
    Unary(char, Box<Expr>),
    Call(String, Box<Expr>),
}

/// Resolves names to VM indices: state variables to `LoadVar`, parameters to
/// their tuple slot.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[&str], signature: &Signature) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();
        let param_map = signature
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { var_map, param_map }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Bytecode::from_ops(ops)
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<()> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(&idx) = self.param_map.get(name) {
                    ops.push(OpCode::LoadParam(idx));
                } else {
                    bail!("Unknown variable or parameter: {name}");
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(match op {
                    '+' => OpCode::Add,
                    '-' => OpCode::Sub,
                    '*' => OpCode::Mul,
                    '/' => OpCode::Div,
                    '^' => OpCode::Pow,
                    _ => bail!("Unknown binary operator: {op}"),
                });
            }
            Expr::Unary(op, operand) => {
                self.compile_recursive(operand, ops)?;
                match op {
                    '-' => ops.push(OpCode::Neg),
                    _ => bail!("Unknown unary operator: {op}"),
                }
            }
            Expr::Call(func, arg) => {
                self.compile_recursive(arg, ops)?;
                ops.push(match func.as_str() {
                    "sin" => OpCode::Sin,
                    "cos" => OpCode::Cos,
                    "tan" => OpCode::Tan,
                    "exp" => OpCode::Exp,
                    "ln" | "log" => OpCode::Ln,
                    "sqrt" => OpCode::Sqrt,
                    "abs" | "fabs" => OpCode::Abs,
                    "sgn" | "sign" => OpCode::Sgn,
                    _ => bail!("Unknown function: {func}"),
                });
            }
        }
        Ok(())
    }
}

/// Parses an infix expression into an AST.
///
/// Precedence from loosest to tightest: `+ -`, `* /`, unary minus, `^`
/// (right associative), calls and parentheses. So `-x^2` is `-(x^2)`.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_sum()?;
    if let Some(token) = parser.peek() {
        bail!("Unexpected trailing token {token:?} in '{input}'");
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&d) = chars.peek() {
                let exponent_sign =
                    (d == '+' || d == '-') && num_str.ends_with(|e: char| e == 'e' || e == 'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = num_str
                .parse()
                .map_err(|_| anyhow!("Invalid number literal '{num_str}'"))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            tokens.push(match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => bail!("Unexpected character '{c}' in '{input}'"),
            });
            chars.next();
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Height of the tree built so far along the current path.
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            bail!("Expression nests too deeply (more than {MAX_NESTING} levels).");
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => bail!("Expected ')'"),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => '+',
                Some(Token::Minus) => '-',
                _ => break,
            };
            self.consume();
            self.descend()?;
            let right = self.parse_product()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        self.depth = entry;
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => '*',
                Some(Token::Slash) => '/',
                _ => break,
            };
            self.consume();
            self.descend()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        self.depth = entry;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            self.descend()?;
            let expr = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Unary('-', Box::new(expr)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            self.descend()?;
            let exponent = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_group(&mut self) -> Result<Expr> {
        self.descend()?;
        let expr = self.parse_sum()?;
        self.expect_rparen()?;
        self.depth -= 1;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_group()?;
                    Ok(Expr::Call(name, Box::new(arg)))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => self.parse_group(),
            Some(token) => bail!("Unexpected token {token:?}"),
            None => bail!("Unexpected end of expression"),
        }
    }
}

// --- ExpressionMap ---

/// A planar recurrence compiled from two expressions over `x`, `y` and named
/// parameters. Parameter names are resolved to tuple slots once, at compile
/// time.
#[derive(Debug, Clone)]
pub struct ExpressionMap {
    x_next: Bytecode,
    y_next: Bytecode,
    signature: Signature,
}

impl ExpressionMap {
    pub fn compile(x_next: &str, y_next: &str, param_names: &[&str]) -> Result<Self> {
        let signature = Signature::new(param_names.iter().copied())?;
        let compiler = Compiler::new(&["x", "y"], &signature);
        let x_code = compiler.compile(&parse(x_next)?)?;
        let y_code = compiler.compile(&parse(y_next)?)?;
        Ok(Self {
            x_next: x_code,
            y_next: y_code,
            signature,
        })
    }
}

impl RecurrenceFunction for ExpressionMap {
    #[inline]
    fn apply(&self, x: f64, y: f64, params: &ParameterTuple) -> (f64, f64) {
        let vars = [x, y];
        let mut stack = [0.0f64; MAX_STACK_DEPTH];
        let x_next = VM::execute(&self.x_next, &vars, params.slots(), &mut stack);
        let y_next = VM::execute(&self.y_next, &vars, params.slots(), &mut stack);
        (x_next, y_next)
    }
}

impl HasSignature for ExpressionMap {
    fn signature(&self) -> Signature {
        self.signature.clone()
    }
}
