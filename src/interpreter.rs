//! Tree‑walking evaluator.
//!
//! Statements execute against a chain of [`Environment`]s; expressions that
//! the resolver bound are looked up at a fixed distance, everything else is a
//! global.  Non‑local exits (`return`, `break`) travel as [`Flow`] values, and
//! runtime faults as `Err(LoxError::Runtime)`, so every exit path passes back
//! through [`Interpreter::execute_block`], which always restores the caller's
//! environment.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::environment::{assign_at, get_at, EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{
    format_number, instance_get, ArrayMethod, ArrayRef, Callable, Instance, LoxClass,
    LoxFunction, NativeFunction, Value,
};

/// How top‑level expression statements are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Values of bare expression statements are discarded.
    #[default]
    Script,

    /// The value of the last bare top‑level expression statement is
    /// reported back to the caller for echoing.
    Repl,
}

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
enum Flow {
    Normal,
    Return(Value),
    Break,
}

pub struct Interpreter<W: Write = io::Stdout> {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    out: W,
    mode: ExecMode,

    /// REPL mode: values of bare top‑level expression statements, in order.
    echoed: Vec<Value>,
}

impl Interpreter<io::Stdout> {
    /// Interpreter printing to standard output.
    pub fn stdout(mode: ExecMode) -> Self {
        Self::new(io::stdout(), mode)
    }
}

impl<W: Write> Interpreter<W> {
    /// Creates a new Interpreter writing `print` output to `out`, and defines
    /// the native functions `clock` and `Array`.
    pub fn new(out: W, mode: ExecMode) -> Self {
        info!("Initializing Interpreter in {:?} mode", mode);

        let globals: EnvRef = Environment::new();

        for native in natives() {
            debug!("Defining native function '{}'", native.name);

            globals
                .borrow_mut()
                .define(native.name, Value::Callable(Callable::Native(Rc::new(native))));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            mode,
            echoed: Vec::new(),
        }
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// The output sink.
    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Merge a resolver distance map into the interpreter.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Recording {} resolved local(s)", locals.len());

        self.locals.extend(locals);
    }

    /// Values echoed since the last call, oldest first.
    pub fn take_echoed(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.echoed)
    }

    /// Interprets a list of resolved statements (a "program").
    ///
    /// A runtime fault aborts the remaining statements and is returned.  In
    /// [`ExecMode::Repl`] the value of every bare top‑level expression
    /// statement is kept for [`Interpreter::take_echoed`], including those
    /// evaluated before a fault.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            match (self.mode, stmt) {
                (ExecMode::Repl, Stmt::Expression(expr)) => {
                    let value: Value = self.evaluate(expr)?;
                    self.echoed.push(value);
                }
                _ => {
                    self.execute(stmt)?;
                }
            }
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                debug!("Printing {}", value);
                writeln!(self.out, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let scope: EnvRef = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, scope)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");

                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }

                debug!("Exited while loop");
                Ok(Flow::Normal)
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                self.environment.borrow_mut().define(
                    &decl.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.define_class(name, superclass.as_ref(), methods)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside `environment`, restoring the current
    /// environment afterwards whatever the outcome.
    fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    fn define_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::ast::FunctionDecl>],
    ) -> Result<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    let at: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(LoxError::runtime(at, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over a scope holding `super`.
        let enclosing: Option<EnvRef> = superclass.as_ref().map(|class| {
            let scope: EnvRef = Environment::with_enclosing(Rc::clone(&self.environment));
            scope
                .borrow_mut()
                .define("super", Value::Callable(Callable::Class(Rc::clone(class))));
            std::mem::replace(&mut self.environment, scope)
        });

        let table: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&self.environment),
                    method.name.lexeme == "init",
                );
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass {
            name: name.lexeme.clone(),
            superclass,
            methods: table,
        };

        if let Some(previous) = enclosing {
            self.environment = previous;
        }

        self.environment
            .borrow_mut()
            .assign(name, Value::Callable(Callable::Class(Rc::new(class))))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match (&operator.token_type, right) {
                    (TokenType::BANG, value) => Ok(Value::Bool(!value.is_truthy())),
                    (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
                    _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                // Short‑circuit on the operand itself, not a coerced bool.
                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        assign_at(&self.environment, distance, name, value.clone());
                    }
                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    values.push(self.evaluate(arg)?);
                }

                self.call(callee, paren, values)
            }

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;
                self.get_property(object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value)?;
                        instance
                            .borrow_mut()
                            .fields
                            .insert(name.lexeme.clone(), value.clone());
                        Ok(value)
                    }
                    Value::Array(_) => {
                        self.evaluate(value)?;
                        Err(LoxError::runtime(name, "Can't add properties to arrays."))
                    }
                    _ => Err(LoxError::runtime(name, "Only instances have fields.")),
                }
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn get_property(&self, object: Value, name: &Token) -> Result<Value> {
        let undefined = || LoxError::runtime(name, format!("Undefined property '{}'.", name.lexeme));

        match object {
            Value::Instance(instance) => instance_get(&instance, &name.lexeme).ok_or_else(undefined),

            Value::Array(array) => match name.lexeme.as_str() {
                "get" => Ok(Value::Callable(Callable::ArrayMethod(array, ArrayMethod::Get))),
                "set" => Ok(Value::Callable(Callable::ArrayMethod(array, ArrayMethod::Set))),
                "length" => Ok(Value::Number(array.borrow().len() as f64)),
                _ => Err(undefined()),
            },

            _ => Err(LoxError::runtime(name, "Only instances have properties.")),
        }
    }

    /// `super.method`: the superclass lives `distance` hops up, `this` one
    /// hop closer.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = *self
            .locals
            .get(&id)
            .ok_or_else(|| LoxError::runtime(keyword, "Unresolved 'super'."))?;

        let superclass = get_at(&self.environment, distance, keyword)?;
        let object = get_at(
            &self.environment,
            distance.saturating_sub(1),
            &Token::synthetic("this", keyword.line),
        )?;

        let (Value::Callable(Callable::Class(superclass)), Value::Instance(object)) =
            (superclass, object)
        else {
            return Err(LoxError::runtime(keyword, "Invalid 'super' binding."));
        };

        let found = superclass.find_method(&method.lexeme).ok_or_else(|| {
            LoxError::runtime(method, format!("Undefined property '{}'.", method.lexeme))
        })?;

        Ok(Value::Callable(Callable::Function(Rc::new(found.bind(object)))))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Invokes a callable after checking its arity.
    fn call(&mut self, callee: Value, paren: &Token, arguments: Vec<Value>) -> Result<Value> {
        let Value::Callable(callable) = callee else {
            return Err(LoxError::runtime(paren, "Can only call functions and classes."));
        };

        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            ));
        }

        match callable {
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);
                (native.func)(&arguments).map_err(|msg| LoxError::runtime(paren, msg))
            }

            Callable::Function(function) => self.call_function(&function, arguments),

            Callable::Class(class) => {
                debug!("Instantiating class '{}'", class.name);

                let instance = Instance::new(Rc::clone(&class));

                if let Some(initializer) = class.find_method("init") {
                    self.call_function(&initializer.bind(Rc::clone(&instance)), arguments)?;
                }

                Ok(Value::Instance(instance))
            }

            Callable::ArrayMethod(array, method) => call_array_method(&array, method, paren, arguments),
        }
    }

    fn call_function(&mut self, function: &LoxFunction, arguments: Vec<Value>) -> Result<Value> {
        let decl = &function.declaration;
        debug!("Calling user-defined function '{}'", decl.name.lexeme);

        let environment: EnvRef = Environment::with_enclosing(Rc::clone(&function.closure));
        {
            let mut scope = environment.borrow_mut();
            for (param, argument) in decl.params.iter().zip(arguments) {
                scope.define(&param.lexeme, argument);
            }
        }

        let flow: Flow = self.execute_block(&decl.body, environment)?;

        // An initializer always yields its instance.
        if function.is_initializer {
            return get_at(
                &function.closure,
                0,
                &Token::synthetic("this", decl.name.line),
            );
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(Value::Nil),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    use Value::{Bool, Number};

    let numbers = || LoxError::runtime(operator, "Operands must be numbers.");

    match &operator.token_type {
        TokenType::EQUAL_EQUAL => Ok(Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Bool(left != right)),

        TokenType::PLUS => match (left, right) {
            (Number(a), Number(b)) => Ok(Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            // string + number coerces; number + string does not.
            (Value::String(a), Number(b)) => Ok(Value::String(a + &format_number(b))),
            _ => Err(LoxError::runtime(
                operator,
                "Operands must be two numbers, two strings, or a string and a number.",
            )),
        },

        op => {
            let (Number(a), Number(b)) = (left, right) else {
                return Err(numbers());
            };

            match op {
                TokenType::MINUS => Ok(Number(a - b)),
                TokenType::STAR => Ok(Number(a * b)),
                TokenType::SLASH => Ok(Number(a / b)),
                TokenType::GREATER => Ok(Bool(a > b)),
                TokenType::GREATER_EQUAL => Ok(Bool(a >= b)),
                TokenType::LESS => Ok(Bool(a < b)),
                TokenType::LESS_EQUAL => Ok(Bool(a <= b)),
                _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
            }
        }
    }
}

fn array_index(array: &ArrayRef, index: &Value, paren: &Token) -> Result<usize> {
    let len: usize = array.borrow().len();

    match index {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && (*n as usize) < len => {
            Ok(*n as usize)
        }
        Value::Number(n) => Err(LoxError::runtime(
            paren,
            format!("Array index {} out of bounds for length {}.", format_number(*n), len),
        )),
        _ => Err(LoxError::runtime(paren, "Array index must be a number.")),
    }
}

fn call_array_method(
    array: &ArrayRef,
    method: ArrayMethod,
    paren: &Token,
    arguments: Vec<Value>,
) -> Result<Value> {
    let index: usize = array_index(array, &arguments[0], paren)?;

    match method {
        ArrayMethod::Get => Ok(array.borrow()[index].clone()),
        ArrayMethod::Set => {
            let value: Value = arguments[1].clone();
            array.borrow_mut()[index] = value.clone();
            Ok(value)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native functions
// ─────────────────────────────────────────────────────────────────────────────

/// Largest length `Array(n)` will allocate.
pub const MAX_ARRAY_SIZE: usize = 1 << 24;

fn natives() -> Vec<NativeFunction> {
    vec![
        NativeFunction {
            name: "clock",
            arity: 0,
            func: |_args: &[Value]| {
                let millis: i64 = chrono::Utc::now().timestamp_millis();
                Ok(Value::Number(millis as f64 / 1000.0))
            },
        },
        NativeFunction {
            name: "Array",
            arity: 1,
            func: |args: &[Value]| match args.first() {
                Some(Value::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => {
                    if *n > MAX_ARRAY_SIZE as f64 {
                        return Err(format!(
                            "Array size must not exceed {}.",
                            MAX_ARRAY_SIZE
                        ));
                    }

                    let size: usize = *n as usize;
                    let mut elements: Vec<Value> = Vec::new();
                    elements
                        .try_reserve_exact(size)
                        .map_err(|_| format!("Can't allocate an array of size {}.", size))?;
                    elements.resize(size, Value::Nil);

                    Ok(Value::Array(Rc::new(std::cell::RefCell::new(elements))))
                }
                _ => Err("Array size must be a non-negative integer.".to_string()),
            },
        },
    ]
}
