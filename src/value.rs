//! Runtime object model: values, callables, classes, instances and arrays.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};

/// Backing store of an `Array(n)` value.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable instance handle.
pub type InstanceRef = Rc<RefCell<Instance>>;

/// A dynamically‑typed Lox value.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(InstanceRef),
    Array(ArrayRef),
}

impl Value {
    /// `nil` and `false` are falsey; everything else (including `0` and
    /// `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl PartialEq for Value {
    /// Primitives compare by value, objects by identity.  Never faults.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            // NaN is equal to itself, so `n == n` holds for every variable.
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Canonical number display: whole numbers lose their `.0`; negative zero
/// keeps its sign.
pub fn format_number(n: f64) -> String {
    if n == 0.0 && n.is_sign_negative() {
        "-0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf: itoa::Buffer = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => f.write_str(&format_number(*n)),

            Value::String(s) => f.write_str(s),

            Value::Callable(c) => write!(f, "{}", c),

            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),

            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callables
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a call expression can invoke.
#[derive(Debug, Clone)]
pub enum Callable {
    /// Host function such as `clock`.
    Native(Rc<NativeFunction>),

    /// User function or method; a bound method is a function whose closure
    /// holds `this`.
    Function(Rc<LoxFunction>),

    /// Calling a class constructs an instance.
    Class(Rc<LoxClass>),

    /// `get` / `set` pre‑bound to one array.
    ArrayMethod(ArrayRef, ArrayMethod),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity,
            Callable::Function(function) => function.arity(),
            Callable::Class(class) => class.arity(),
            Callable::ArrayMethod(_, method) => method.arity(),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::ArrayMethod(a, m), Callable::ArrayMethod(b, n)) => {
                Rc::ptr_eq(a, b) && m == n
            }
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(_) => write!(f, "<native fn>"),
            Callable::Function(function) => write!(f, "<fn {}>", function.declaration.name.lexeme),
            Callable::Class(class) => write!(f, "{}", class.name),
            Callable::ArrayMethod(_, _) => write!(f, "<native fn>"),
        }
    }
}

/// Host function signature: receives already‑evaluated arguments; an `Err`
/// becomes a runtime fault at the call site.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

/// Methods exposed by array values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMethod {
    Get,
    Set,
}

impl ArrayMethod {
    pub fn arity(self) -> usize {
        match self {
            ArrayMethod::Get => 1,
            ArrayMethod::Set => 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Functions and classes
// ─────────────────────────────────────────────────────────────────────────────

/// A closure: declaration plus the environment active where it was defined.
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl fmt::Debug for LoxFunction {
    // The closure may (indirectly) contain this function; don't follow it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.declaration.name.lexeme)
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure has `this` bound to `instance`.
    pub fn bind(&self, instance: InstanceRef) -> LoxFunction {
        let environment: EnvRef = Environment::with_enclosing(Rc::clone(&self.closure));
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction::new(
            Rc::clone(&self.declaration),
            environment,
            self.is_initializer,
        )
    }
}

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    /// Own methods first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class's arity is its initializer's.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

pub struct Instance {
    pub class: Rc<LoxClass>,
    pub fields: HashMap<String, Value>,
}

impl fmt::Debug for Instance {
    // Fields may refer back to this instance.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Instance {
    pub fn new(class: Rc<LoxClass>) -> InstanceRef {
        Rc::new(RefCell::new(Instance {
            class,
            fields: HashMap::new(),
        }))
    }
}

/// Property lookup: fields shadow methods; methods come back bound to
/// `instance`.  `None` means the property is undefined.
pub fn instance_get(instance: &InstanceRef, name: &str) -> Option<Value> {
    let found_field: Option<Value> = instance.borrow().fields.get(name).cloned();
    if found_field.is_some() {
        return found_field;
    }

    let method: Option<Rc<LoxFunction>> = instance.borrow().class.find_method(name);

    method.map(|method| {
        Value::Callable(Callable::Function(Rc::new(
            method.bind(Rc::clone(instance)),
        )))
    })
}
