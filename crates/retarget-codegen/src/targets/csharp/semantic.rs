//! Semantic operations and JS globals in C# spelling.
//!
//! Collections go through LINQ where the BCL has no direct method. LINQ
//! extension methods cannot bind on `dynamic`, so receivers of unknown type
//! are cast to `IEnumerable<dynamic>` first (see `sequence`).

use super::ast::*;
use super::runtime::Helper;
use super::transform::{CSharpTransformer, exception_type, int_literal};
use crate::precedence::Op;
use crate::types::{Primitive, TypeRef};
use retarget_il::{DebugLevel, Endian, Node, NumericType};

/// Element width of a typed array or cast target, in C# spelling.
fn numeric(ty: NumericType) -> &'static str {
    match ty {
        NumericType::Int8 => "sbyte",
        NumericType::Uint8 => "byte",
        NumericType::Int16 => "short",
        NumericType::Uint16 => "ushort",
        NumericType::Int32 => "int",
        NumericType::Uint32 => "uint",
        NumericType::Int64 => "long",
        NumericType::Uint64 => "ulong",
        NumericType::Float32 => "float",
        NumericType::Float64 => "double",
    }
}

fn unsigned_of_width(bits: u32) -> &'static str {
    match bits {
        8 => "byte",
        16 => "ushort",
        64 => "ulong",
        _ => "uint",
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// `Encoding` property for a JS encoding name.
fn text_encoding(encoding: &str) -> &'static str {
    match encoding {
        "ascii" => "ASCII",
        "latin1" | "latin-1" | "binary" | "iso-8859-1" => "Latin1",
        "utf16" | "utf-16" | "utf16le" | "utf-16le" => "Unicode",
        _ => "UTF8",
    }
}

impl CSharpTransformer {
    /// Semantic operations that read best as statements of their own.
    pub(super) fn semantic_statement(&mut self, node: &Node) -> Option<Vec<Stmt>> {
        let statement = match node {
            Node::ArrayReverse { array } => {
                let is_array = self.type_of(array).is_some_and(|ty| ty.is_array());
                let value = self.expr(array);
                if is_array {
                    Expr::call_path("Array.Reverse", vec![value])
                } else {
                    value.method("Reverse", Vec::new())
                }
            }
            Node::ArraySort { array, compare } => {
                let ty = self.type_of(array);
                let mut args = Vec::new();
                if let Some(compare) = compare {
                    args.push(self.callback(compare, 2));
                }
                let value = self.expr(array);
                match ty {
                    Some(ty) if ty.is_array() => {
                        args.insert(0, value);
                        Expr::call_path("Array.Sort", args)
                    }
                    Some(ty) if ty.is_list() => value.method("Sort", args),
                    _ => Expr::cast("List<dynamic>", value).method("Sort", args),
                }
            }
            Node::ArrayClear { array } => {
                let is_array = self.type_of(array).is_some_and(|ty| ty.is_array());
                let value = self.expr(array);
                if is_array {
                    Expr::call_path("Array.Clear", vec![value])
                } else {
                    value.method("Clear", Vec::new())
                }
            }
            Node::ArrayForEach { array, callback } => return self.for_each_callback(array, callback),
            Node::MapSet { map, key, value } => {
                let map = self.expr(map);
                let key = self.expr(key);
                let value = self.expr(value);
                Expr::assign(map.index(key), value)
            }
            _ => return None,
        };
        Some(vec![Stmt::Expr(statement)])
    }

    /// `forEach` with an inline callback, as a `foreach` loop. Callbacks that
    /// `return` early keep their lambda and are invoked per element.
    fn for_each_callback(&mut self, array: &Node, callback: &Node) -> Option<Vec<Stmt>> {
        let function = callback.as_inline_function()?;
        let names = function
            .params
            .iter()
            .map(|param| param.as_identifier().map(str::to_string))
            .collect::<Option<Vec<_>>>()?;
        if names.len() > 2 || function.is_async {
            return None;
        }
        let returns = !function.expression
            && function
                .body
                .any(&mut |n| matches!(n, Node::ReturnStatement { .. }));

        let element = self
            .type_of(array)
            .and_then(|ty| ty.element().cloned())
            .unwrap_or(TypeRef::ANY);
        let mut iter = self.sequence(array);
        let mut out = Vec::new();
        let name = match names.as_slice() {
            [] => self.temp("_item"),
            [item] => {
                self.declare(item, element);
                self.ident(item)
            }
            [item, index] => {
                self.declare(item, element);
                self.declare(index, TypeRef::INT);
                let pair = Expr::Lambda {
                    params: vec!["v".to_string(), "i".to_string()],
                    body: LambdaBody::Expr(Box::new(Expr::name("(v, i)"))),
                    is_async: false,
                };
                iter = iter.method("Select", vec![pair]);
                format!("({}, {})", self.ident(item), self.ident(index))
            }
            _ => return None,
        };

        let body = if returns {
            // `return` inside the callback means "next element".
            let action = self.temp("_each");
            let arity = names.len().max(1);
            out.push(Stmt::Local {
                ty: Some(format!("Action<{}>", vec!["dynamic"; arity].join(", "))),
                name: action.clone(),
                value: Some(self.lambda(function)),
            });
            let args = match names.as_slice() {
                [item, index] => vec![Expr::name(&self.ident(item)), Expr::name(&self.ident(index))],
                _ => vec![Expr::name(&name)],
            };
            vec![Stmt::Expr(Expr::call(Expr::Name(action), args))]
        } else if function.expression {
            self.in_loop(|this| this.expression_statement(&function.body))
        } else {
            self.in_loop(|this| this.block(function.body_statements()))
        };
        out.push(Stmt::ForEach {
            ty: None,
            name,
            iter,
            body,
        });
        Some(out)
    }

    /// A callback passed to LINQ or `Sort`. Inline functions become
    /// lambdas; anything else is wrapped so method groups bind too.
    fn callback(&mut self, node: &Node, arity: usize) -> Expr {
        if let Some(function) = node.as_inline_function() {
            return self.lambda(function);
        }
        let func = self.expr(node);
        let params: Vec<String> = (0..arity).map(|i| format!("_a{i}")).collect();
        let args = params.iter().map(|param| Expr::name(param)).collect();
        Expr::Lambda {
            params,
            body: LambdaBody::Expr(Box::new(Expr::call(func, args))),
            is_async: false,
        }
    }

    /// Materialize a LINQ chain as the same collection kind as `source`.
    fn collect_like(&self, source: &Node, chain: Expr) -> Expr {
        if self.type_of(source).is_some_and(|ty| ty.is_array()) {
            chain.method("ToArray", Vec::new())
        } else {
            chain.method("ToList", Vec::new())
        }
    }

    /// `Math.Floor` and friends yield `double`; JS code indexes with the result.
    fn rounding(&mut self, function: &str, argument: &Node) -> Expr {
        if self.is_integer(argument) {
            return self.expr(argument);
        }
        let value = self.expr(argument);
        let value = match function {
            "Round" => Expr::call_path("Math.Floor", vec![Expr::bin(Op::Add, value, Expr::literal("0.5"))]),
            other => Expr::call_path(&format!("Math.{other}"), vec![value]),
        };
        Expr::cast("int", value)
    }

    fn rotate(&mut self, value: &Node, amount: &Node, bits: u32, left: bool) -> Expr {
        if !matches!(bits, 8 | 16 | 32 | 64) {
            return self.unsupported(format!("{bits}-bit rotation"));
        }
        let ty = unsigned_of_width(bits);
        let amount = match int_literal(amount) {
            Some(n) => Expr::int(n.rem_euclid(bits as i64)),
            None => self.expr(amount),
        };
        let value = Expr::cast(ty, self.expr(value));
        if bits == 32 || bits == 64 {
            self.using("System.Numerics");
            let function = if left {
                "BitOperations.RotateLeft"
            } else {
                "BitOperations.RotateRight"
            };
            return Expr::call_path(function, vec![value, amount]);
        }
        let (first, second) = if left {
            (Op::Shl, Op::Shr)
        } else {
            (Op::Shr, Op::Shl)
        };
        let rest = Expr::bin(Op::Sub, Expr::int(bits as i64), amount.clone());
        Expr::cast(
            ty,
            Expr::bin(
                Op::BitOr,
                Expr::bin(first, value.clone(), amount),
                Expr::bin(second, value, rest),
            ),
        )
    }

    fn cast(&mut self, expression: &Node, target: NumericType) -> Expr {
        let ty = numeric(target);
        let source = self.type_of(expression).and_then(|ty| ty.primitive());
        let value = self.expr(expression);
        if source == Some(Primitive::from(target)) {
            return value;
        }
        if target.is_float() {
            return Expr::cast(ty, value);
        }
        Expr::Unchecked(Box::new(Expr::cast(ty, value)))
    }

    fn pack_bytes(&mut self, bytes: &[Node], bits: u32, endian: Endian) -> Expr {
        let ty = unsigned_of_width(bits);
        let count = bytes.len();
        let mut terms = Vec::new();
        for (i, byte) in bytes.iter().enumerate() {
            let position = match endian {
                Endian::Big => count - 1 - i,
                Endian::Little => i,
            };
            let value = Expr::cast(ty, self.expr(byte));
            terms.push(match position {
                0 => value,
                n => Expr::bin(Op::Shl, value, Expr::int(n as i64 * 8)),
            });
        }
        let mut terms = terms.into_iter();
        let Some(first) = terms.next() else {
            return Expr::int(0);
        };
        let combined = terms.fold(first, |acc, term| Expr::bin(Op::BitOr, acc, term));
        // Sub-int operands promote to int.
        if bits < 32 {
            Expr::cast(ty, combined)
        } else {
            combined
        }
    }

    fn unpack_bytes(&mut self, value: &Node, bits: u32, endian: Endian) -> Expr {
        let ty = unsigned_of_width(bits);
        let value = self.expr(value);
        let width = (bits / 8).max(1) as i64;
        if value.is_simple() {
            let items = (0..width)
                .map(|i| {
                    let shift = match endian {
                        Endian::Big => (width - 1 - i) * 8,
                        Endian::Little => i * 8,
                    };
                    let shifted = match shift {
                        0 => value.clone(),
                        n => Expr::bin(Op::Shr, value.clone(), Expr::int(n)),
                    };
                    Expr::cast("byte", shifted)
                })
                .collect();
            return Expr::NewArray {
                element: "byte".to_string(),
                size: None,
                items,
            };
        }
        let word = Expr::cast(ty, value);
        let word = match endian {
            Endian::Big if bits > 8 => {
                self.using("System.Buffers.Binary");
                Expr::call_path("BinaryPrimitives.ReverseEndianness", vec![word])
            }
            _ => word,
        };
        Expr::call_path("BitConverter.GetBytes", vec![word])
    }

    fn typed_array(&mut self, element: NumericType, size: Option<&Node>, source: Option<&Node>) -> Expr {
        let ty = numeric(element);
        match (size, source) {
            (_, Some(Node::ArrayExpression { elements })) => {
                let items = elements
                    .iter()
                    .map(|item| match item {
                        Some(item) => {
                            let value = self.expr(item);
                            match item {
                                Node::Literal(_) => value,
                                _ => Expr::cast(ty, value),
                            }
                        }
                        None => Expr::literal("0"),
                    })
                    .collect();
                Expr::NewArray {
                    element: ty.to_string(),
                    size: None,
                    items,
                }
            }
            (_, Some(source)) => {
                let converted = if self.type_of(source).and_then(|t| t.element().cloned())
                    == Some(TypeRef::Primitive(element.into()))
                {
                    self.sequence(source)
                } else {
                    let items = self.sequence(source);
                    let convert = Expr::lambda("v", Expr::cast(ty, Expr::name("v")));
                    items.method("Select", vec![convert])
                };
                converted.method("ToArray", Vec::new())
            }
            // A source that arrived in the size slot.
            (Some(size), None) if matches!(self.type_of(size), Some(t) if t.is_array() || t.is_list()) => {
                self.typed_array(element, None, Some(size))
            }
            (Some(size), None) => Expr::NewArray {
                element: ty.to_string(),
                size: Some(Box::new(self.expr(size))),
                items: Vec::new(),
            },
            (None, None) => Expr::NewArray {
                element: ty.to_string(),
                size: Some(Box::new(Expr::int(0))),
                items: Vec::new(),
            },
        }
    }

    fn map_keys(&mut self, map: &Node, values: bool) -> Expr {
        let map = self.expr(map);
        let view = map.member(if values { "Values" } else { "Keys" });
        Expr::call_path("Enumerable.ToList", vec![view])
    }

    fn map_entries(&mut self, map: &Node) -> Expr {
        let known = self.type_of(map).is_some_and(|ty| ty.is_map());
        let map = self.expr(map);
        let pair = Expr::New {
            ty: "List<dynamic>".to_string(),
            args: Vec::new(),
            init: Some(Initializer::Items(vec![
                Expr::name("e").member("Key"),
                Expr::name("e").member("Value"),
            ])),
        };
        let source = if known {
            map
        } else {
            self.using("System.Collections");
            Expr::cast("IDictionary", map).method("Cast<DictionaryEntry>", Vec::new())
        };
        source
            .method("Select", vec![Expr::lambda("e", pair)])
            .method("ToList", Vec::new())
    }

    fn encode(&mut self, encoding: Option<&str>, value: &Node, to_bytes: bool) -> Expr {
        let value = self.expr(value);
        let encoding = encoding.map(str::to_ascii_lowercase);
        match (encoding.as_deref(), to_bytes) {
            (Some("hex"), true) => Expr::call_path("Convert.FromHexString", vec![value]),
            (Some("hex"), false) => Expr::call_path("Convert.ToHexString", vec![value])
                .method("ToLowerInvariant", Vec::new()),
            (Some("base64"), true) => Expr::call_path("Convert.FromBase64String", vec![value]),
            (Some("base64"), false) => Expr::call_path("Convert.ToBase64String", vec![value]),
            (other, to_bytes) => {
                self.using("System.Text");
                let property = text_encoding(other.unwrap_or("utf8"));
                let method = if to_bytes { "GetBytes" } else { "GetString" };
                Expr::name("Encoding").member(property).method(method, vec![value])
            }
        }
    }

    fn from_char_codes(&mut self, codes: &[Node]) -> Expr {
        match codes {
            [Node::SpreadElement { argument }] => {
                let chars = self
                    .sequence(argument)
                    .method("Select", vec![Expr::lambda("c", Expr::cast("char", Expr::name("c")))])
                    .method("ToArray", Vec::new());
                Expr::construct("string", vec![chars])
            }
            [code] => {
                let code = self.expr(code);
                Expr::cast("char", code).method("ToString", Vec::new())
            }
            codes => {
                let items = codes
                    .iter()
                    .map(|code| {
                        let code = self.expr(code);
                        Expr::cast("char", code)
                    })
                    .collect();
                Expr::construct(
                    "string",
                    vec![Expr::NewArray {
                        element: "char".to_string(),
                        size: None,
                        items,
                    }],
                )
            }
        }
    }

    fn min_max(&mut self, function: &str, arguments: &[Node]) -> Expr {
        match arguments {
            [Node::SpreadElement { argument }] => {
                let method = if function == "Min" { "Min" } else { "Max" };
                self.sequence(argument).method(method, Vec::new())
            }
            [] => Expr::name(if function == "Min" {
                "double.PositiveInfinity"
            } else {
                "double.NegativeInfinity"
            }),
            [single] => self.expr(single),
            [first, rest @ ..] => {
                let path = format!("Math.{function}");
                let first = self.expr(first);
                rest.iter().fold(first, |acc, next| {
                    let next = self.expr(next);
                    Expr::call_path(&path, vec![acc, next])
                })
            }
        }
    }

    fn debug_output(&mut self, arguments: &[Node], level: DebugLevel) -> Expr {
        let writer = match level {
            DebugLevel::Log | DebugLevel::Info => "Console.WriteLine",
            DebugLevel::Warn | DebugLevel::Error => "Console.Error.WriteLine",
        };
        let mut args = self.arguments(arguments);
        if args.len() > 1 {
            args.insert(0, Expr::Str(" ".to_string()));
            args = vec![Expr::call_path("string.Join", args)];
        }
        Expr::call_path(writer, args)
    }

    fn parse_integer(&mut self, string: &Node, radix: Option<&Node>) -> Expr {
        let value = self.expr(string);
        match radix.map(|radix| (int_literal(radix), radix)) {
            None | Some((Some(10), _)) => Expr::call_path("int.Parse", vec![value]),
            Some((Some(radix), _)) => Expr::call_path("Convert.ToInt32", vec![value, Expr::int(radix)]),
            Some((None, radix)) => {
                let radix = self.expr(radix);
                Expr::call_path("Convert.ToInt32", vec![value, radix])
            }
        }
    }

    pub(super) fn semantic(&mut self, node: &Node) -> Expr {
        match node {
            // ------------------------------------------------------------ arrays
            Node::ArrayLength { array } => {
                let length = match self.type_of(array) {
                    Some(ty) if ty.is_array() || ty.is_string() => "Length",
                    _ => "Count",
                };
                self.expr(array).member(length)
            }
            Node::ArrayPush { array, values } => {
                let target = self.expr(array);
                match values.as_slice() {
                    [Node::SpreadElement { argument }] => {
                        let items = self.sequence(argument);
                        target.method("AddRange", vec![items])
                    }
                    [single] => {
                        let value = self.expr(single);
                        target.method("Add", vec![value])
                    }
                    many => {
                        let items = self.arguments(many);
                        target.method(
                            "AddRange",
                            vec![Expr::NewArray {
                                element: "dynamic".to_string(),
                                size: None,
                                items,
                            }],
                        )
                    }
                }
            }
            Node::ArrayPop { array } => {
                let helper = self.helper(Helper::Pop);
                Expr::call(helper, vec![self.expr(array)])
            }
            Node::ArrayShift { array } => {
                let helper = self.helper(Helper::Shift);
                Expr::call(helper, vec![self.expr(array)])
            }
            Node::ArrayUnshift { array, values } => {
                let target = self.expr(array);
                match values.as_slice() {
                    [single] if !matches!(single, Node::SpreadElement { .. }) => {
                        let value = self.expr(single);
                        target.method("Insert", vec![Expr::int(0), value])
                    }
                    many => {
                        let items = self.arguments(many);
                        target.method(
                            "InsertRange",
                            vec![
                                Expr::int(0),
                                Expr::NewArray {
                                    element: "dynamic".to_string(),
                                    size: None,
                                    items,
                                },
                            ],
                        )
                    }
                }
            }
            Node::ArraySlice { array, start, end } => {
                let helper = self.helper(Helper::Slice);
                let mut args = vec![self.expr(array)];
                args.push(match start {
                    Some(start) => self.expr(start),
                    None => Expr::int(0),
                });
                if let Some(end) = end {
                    args.push(self.expr(end));
                }
                let slice = Expr::call(helper, args);
                if self.type_of(array).is_some_and(|ty| ty.is_array()) {
                    slice.method("ToArray", Vec::new())
                } else {
                    slice
                }
            }
            Node::ArraySplice {
                array,
                start,
                delete_count,
                items,
            } => {
                let helper = self.helper(Helper::Splice);
                let mut args = vec![self.expr(array), self.expr(start)];
                match delete_count {
                    Some(count) => args.push(self.expr(count)),
                    None if !items.is_empty() => args.push(Expr::null()),
                    None => {}
                }
                args.extend(self.arguments(items));
                Expr::call(helper, args)
            }
            Node::ArrayConcat { array, others } => {
                let mut chain = self.sequence(array);
                for other in others {
                    let other = self.sequence(other);
                    chain = chain.method("Concat", vec![other]);
                }
                self.collect_like(array, chain)
            }
            Node::ArrayIndexOf { array, value } => {
                let is_array = self.type_of(array).is_some_and(|ty| ty.is_array());
                let target = self.expr(array);
                let value = self.expr(value);
                if is_array {
                    Expr::call_path("Array.IndexOf", vec![target, value])
                } else {
                    target.method("IndexOf", vec![value])
                }
            }
            Node::ArrayIncludes { array, value } => {
                let items = self.sequence(array);
                items.method("Contains", vec![self.expr(value)])
            }
            Node::ArrayJoin { array, separator } => {
                let separator = match separator {
                    Some(separator) => self.expr(separator),
                    None => Expr::Str(",".to_string()),
                };
                Expr::call_path("string.Join", vec![separator, self.expr(array)])
            }
            Node::ArrayReverse { array } => {
                let items = self.sequence(array);
                self.collect_like(array, items.method("Reverse", Vec::new()))
            }
            Node::ArraySort { array, compare } => {
                let items = self.sequence(array);
                let sorted = match compare {
                    Some(compare) => {
                        let compare = self.callback(compare, 2);
                        let element = self
                            .type_of(array)
                            .and_then(|ty| ty.element().cloned())
                            .unwrap_or(TypeRef::ANY);
                        let comparer = Expr::call_path(
                            &format!("Comparer<{}>.Create", self.ty(&element)),
                            vec![compare],
                        );
                        items.method("Order", vec![comparer])
                    }
                    None => items.method("Order", Vec::new()),
                };
                self.collect_like(array, sorted)
            }
            Node::ArrayFill {
                array,
                value,
                start,
                end,
            } => match array.as_ref() {
                Node::ArrayCreation {
                    size: Some(size),
                    element_type,
                } if start.is_none() && end.is_none() => {
                    let value = self.expr(value);
                    let repeat = Expr::call_path("Enumerable.Repeat", vec![value, self.expr(size)]);
                    if element_type.is_some() {
                        repeat.method("ToArray", Vec::new())
                    } else {
                        repeat.method("ToList", Vec::new())
                    }
                }
                _ => {
                    let helper = self.helper(Helper::Fill);
                    let mut args = vec![self.expr(array), self.expr(value)];
                    if let Some(start) = start {
                        args.push(self.expr(start));
                    }
                    if let Some(end) = end {
                        if start.is_none() {
                            args.push(Expr::int(0));
                        }
                        args.push(self.expr(end));
                    }
                    Expr::call(helper, args)
                }
            },
            Node::ArrayMap { array, callback } => {
                let items = self.sequence(array);
                let callback = self.callback(callback, 1);
                self.collect_like(array, items.method("Select", vec![callback]))
            }
            Node::ArrayFilter { array, callback } => {
                let items = self.sequence(array);
                let callback = self.callback(callback, 1);
                self.collect_like(array, items.method("Where", vec![callback]))
            }
            Node::ArrayForEach { array, callback } => {
                let items = self.sequence(array).method("ToList", Vec::new());
                let callback = self.callback(callback, 1);
                items.method("ForEach", vec![callback])
            }
            Node::ArrayReduce {
                array,
                callback,
                initial,
            } => {
                let items = self.sequence(array);
                let mut args = Vec::new();
                if let Some(initial) = initial {
                    let known = self.type_of(initial).is_some();
                    let seed = self.expr(initial);
                    // A `dynamic` seed would make the call dynamically bound.
                    args.push(if known { seed } else { Expr::cast("object", seed) });
                }
                args.push(self.callback(callback, 2));
                items.method("Aggregate", args)
            }
            Node::ArrayFind { array, callback } => {
                let items = self.sequence(array);
                let callback = self.callback(callback, 1);
                items.method("FirstOrDefault", vec![callback])
            }
            Node::ArrayEvery { array, callback } => {
                let items = self.sequence(array);
                let callback = self.callback(callback, 1);
                items.method("All", vec![callback])
            }
            Node::ArraySome { array, callback } => {
                let items = self.sequence(array);
                let callback = self.callback(callback, 1);
                items.method("Any", vec![callback])
            }
            Node::ArrayCreation { size, element_type } => match (size, element_type) {
                (size, Some(element)) => {
                    let element = self.ty(&crate::types::parse_il_type(element));
                    let size = match size {
                        Some(size) => self.expr(size),
                        None => Expr::int(0),
                    };
                    Expr::NewArray {
                        element,
                        size: Some(Box::new(size)),
                        items: Vec::new(),
                    }
                }
                (Some(size), None) => {
                    let size = self.expr(size);
                    Expr::call_path("Enumerable.Repeat<dynamic>", vec![Expr::null(), size])
                        .method("ToList", Vec::new())
                }
                (None, None) => Expr::construct("List<dynamic>", Vec::new()),
            },
            Node::TypedArrayCreation {
                element_type,
                size,
                source,
            } => self.typed_array(*element_type, size.as_deref(), source.as_deref()),
            Node::ArrayFrom { iterable } => {
                if self.is_stringy(iterable) {
                    let text = self.expr(iterable);
                    let chars = Expr::lambda("c", Expr::name("c").method("ToString", Vec::new()));
                    return text.method("Select", vec![chars]).method("ToList", Vec::new());
                }
                self.sequence(iterable).method("ToList", Vec::new())
            }
            Node::ArrayClear { array } => {
                let value = self.expr(array);
                value.method("Clear", Vec::new())
            }
            Node::ArrayUnique { array } => {
                let items = self.sequence(array).method("Distinct", Vec::new());
                self.collect_like(array, items)
            }
            Node::ArrayXor { left, right } => {
                let helper = self.helper(Helper::XorBytes);
                let left = self.expr(left);
                Expr::call(helper, vec![left, self.expr(right)])
            }
            Node::CopyArray { array } => {
                let items = self.sequence(array);
                self.collect_like(array, items)
            }

            // ----------------------------------------------------------- strings
            Node::StringLength { string } => self.expr(string).member("Length"),
            Node::StringSplit { string, separator } => {
                let text = self.expr(string);
                match separator.as_deref() {
                    None => Expr::New {
                        ty: "List<string>".to_string(),
                        args: Vec::new(),
                        init: Some(Initializer::Items(vec![text])),
                    },
                    Some(separator) if separator.as_string_literal() == Some("") => {
                        let chars = Expr::lambda("c", Expr::name("c").method("ToString", Vec::new()));
                        text.method("Select", vec![chars]).method("ToList", Vec::new())
                    }
                    Some(separator) => {
                        let separator = self.expr(separator);
                        text.method("Split", vec![separator]).method("ToList", Vec::new())
                    }
                }
            }
            Node::StringSubstring { string, start, end } => {
                let helper = self.helper(Helper::Substring);
                let mut args = vec![self.expr(string), self.expr(start)];
                if let Some(end) = end {
                    args.push(self.expr(end));
                }
                Expr::call(helper, args)
            }
            Node::StringIndexOf { string, search } => {
                let text = self.expr(string);
                let search = self.expr(search);
                text.method("IndexOf", vec![search, Expr::name("StringComparison.Ordinal")])
            }
            Node::StringReplace {
                string,
                search,
                replacement,
                all,
            } => {
                let text = self.expr(string);
                let search = self.expr(search);
                let replacement = self.expr(replacement);
                if *all {
                    text.method("Replace", vec![search, replacement])
                } else {
                    let helper = self.helper(Helper::ReplaceFirst);
                    Expr::call(helper, vec![text, search, replacement])
                }
            }
            Node::StringToUpper { string } => self.expr(string).method("ToUpperInvariant", Vec::new()),
            Node::StringToLower { string } => self.expr(string).method("ToLowerInvariant", Vec::new()),
            Node::StringTrim { string } => self.expr(string).method("Trim", Vec::new()),
            Node::StringStartsWith { string, search } => {
                let text = self.expr(string);
                let search = self.expr(search);
                text.method("StartsWith", vec![search, Expr::name("StringComparison.Ordinal")])
            }
            Node::StringEndsWith { string, search } => {
                let text = self.expr(string);
                let search = self.expr(search);
                text.method("EndsWith", vec![search, Expr::name("StringComparison.Ordinal")])
            }
            Node::StringIncludes { string, search } => {
                let text = self.expr(string);
                text.method("Contains", vec![self.expr(search)])
            }
            Node::StringRepeat { string, count } => {
                let text = self.expr(string);
                let repeated = Expr::call_path("Enumerable.Repeat", vec![text, self.expr(count)]);
                Expr::call_path("string.Concat", vec![repeated])
            }
            Node::StringPadStart {
                string,
                length,
                fill,
            }
            | Node::StringPadEnd {
                string,
                length,
                fill,
            } => {
                let method = if matches!(node, Node::StringPadStart { .. }) {
                    "PadLeft"
                } else {
                    "PadRight"
                };
                let text = self.expr(string);
                let length = self.expr(length);
                let single = match fill.as_deref() {
                    None => Some(' '),
                    Some(fill) => fill.as_string_literal().and_then(single_char),
                };
                match (single, fill.as_deref()) {
                    (Some(c), _) => text.method(method, vec![length, Expr::Char(c)]),
                    (None, Some(fill)) => {
                        let helper = self.helper(if method == "PadLeft" {
                            Helper::PadStart
                        } else {
                            Helper::PadEnd
                        });
                        Expr::call(helper, vec![text, length, self.expr(fill)])
                    }
                    (None, None) => text.method(method, vec![length]),
                }
            }
            Node::StringCharAt { string, index } => {
                let helper = self.helper(Helper::CharAt);
                let text = self.expr(string);
                Expr::call(helper, vec![text, self.expr(index)])
            }
            Node::StringCharCodeAt { string, index } => {
                let text = self.expr(string);
                Expr::cast("int", text.index(self.expr(index)))
            }
            Node::StringFromCharCodes { codes } => self.from_char_codes(codes),
            Node::StringConcat { parts } => {
                let parts = self.arguments(parts);
                Expr::call_path("string.Concat", parts)
            }
            Node::StringToBytes { string, encoding } => {
                self.encode(encoding.as_deref(), string, true)
            }
            Node::BytesToString { bytes, encoding } => {
                self.encode(encoding.as_deref(), bytes, false)
            }

            // -------------------------------------------------------------- math
            Node::MathFloor { argument } => self.rounding("Floor", argument),
            Node::MathCeil { argument } => self.rounding("Ceiling", argument),
            Node::MathRound { argument } => self.rounding("Round", argument),
            Node::MathTrunc { argument } => self.rounding("Truncate", argument),
            Node::MathAbs { argument } => {
                let value = self.expr(argument);
                Expr::call_path("Math.Abs", vec![value])
            }
            Node::MathMin { arguments } => self.min_max("Min", arguments),
            Node::MathMax { arguments } => self.min_max("Max", arguments),
            Node::MathPow { base, exponent } => {
                let base = self.expr(base);
                Expr::call_path("Math.Pow", vec![base, self.expr(exponent)])
            }
            Node::MathSqrt { argument } => {
                let value = self.expr(argument);
                Expr::call_path("Math.Sqrt", vec![value])
            }
            Node::MathRandom {} => {
                Expr::name("Random.Shared").method("NextDouble", Vec::new())
            }
            Node::MathSign { argument } => {
                let value = self.expr(argument);
                Expr::call_path("Math.Sign", vec![value])
            }
            Node::MathLog { argument } => {
                let value = self.expr(argument);
                Expr::call_path("Math.Log", vec![value])
            }

            // -------------------------------------------------------------- bits
            Node::RotateLeft {
                value,
                amount,
                bits,
            } => self.rotate(value, amount, *bits, true),
            Node::RotateRight {
                value,
                amount,
                bits,
            } => self.rotate(value, amount, *bits, false),
            Node::Cast {
                expression,
                target_type,
            } => self.cast(expression, *target_type),
            Node::PackBytes { bytes, bits, endian } => self.pack_bytes(bytes, *bits, *endian),
            Node::UnpackBytes { value, bits, endian } => self.unpack_bytes(value, *bits, *endian),
            Node::ParseInteger { string, radix } => self.parse_integer(string, radix.as_deref()),
            Node::ParseFloat { string } => {
                self.using("System.Globalization");
                let value = self.expr(string);
                Expr::call_path(
                    "double.Parse",
                    vec![value, Expr::name("CultureInfo.InvariantCulture")],
                )
            }
            Node::NumberToString { value, radix } => {
                let number = self.expr(value);
                match radix.as_deref().map(|radix| (int_literal(radix), radix)) {
                    None | Some((Some(10), _)) => number.method("ToString", Vec::new()),
                    Some((Some(radix), _)) => Expr::call_path(
                        "Convert.ToString",
                        vec![Expr::cast("long", number), Expr::int(radix)],
                    ),
                    Some((None, radix)) => {
                        let radix = self.expr(radix);
                        Expr::call_path("Convert.ToString", vec![Expr::cast("long", number), radix])
                    }
                }
            }
            Node::IsInteger { value } => {
                let value = self.expr(value);
                Expr::bin(Op::Eq, Expr::bin(Op::Mod, value, Expr::int(1)), Expr::int(0))
            }

            // --------------------------------------------------------- encodings
            Node::HexEncode { bytes } => self.encode(Some("hex"), bytes, false),
            Node::HexDecode { string } => self.encode(Some("hex"), string, true),
            Node::Base64Encode { bytes } => self.encode(Some("base64"), bytes, false),
            Node::Base64Decode { string } => self.encode(Some("base64"), string, true),

            // -------------------------------------------------------------- maps
            Node::MapCreation { entries } => {
                let ty = self.ty(&TypeRef::map(TypeRef::ANY, TypeRef::ANY));
                self.dictionary(entries, &ty)
            }
            Node::MapGet { map, key } => {
                let known = self.type_of(map).is_some_and(|ty| ty.is_map());
                let target = self.expr(map);
                let key = self.expr(key);
                if known {
                    target.method("GetValueOrDefault", vec![key])
                } else {
                    target.index(key)
                }
            }
            Node::MapSet { map, key, value } => {
                let target = self.expr(map);
                let key = self.expr(key);
                Expr::assign(target.index(key), self.expr(value))
            }
            Node::MapHas { map, key } => {
                let set = matches!(self.type_of(map), Some(TypeRef::Named { name, .. }) if name == "Set");
                let target = self.expr(map);
                let key = self.expr(key);
                target.method(if set { "Contains" } else { "ContainsKey" }, vec![key])
            }
            Node::MapDelete { map, key } => {
                let target = self.expr(map);
                target.method("Remove", vec![self.expr(key)])
            }
            Node::MapKeys { map } => self.map_keys(map, false),
            Node::MapValues { map } => self.map_keys(map, true),
            Node::MapEntries { map } => self.map_entries(map),
            Node::MapSize { map } => self.expr(map).member("Count"),
            Node::ObjectFreeze { object } => self.expr(object),
            Node::IsArray { value } => {
                self.using("System.Collections");
                Expr::Is {
                    value: Box::new(self.expr(value)),
                    ty: "IList".to_string(),
                }
            }

            // -------------------------------------------------------------- misc
            Node::DebugOutput { arguments, level } => self.debug_output(arguments, *level),
            Node::ErrorCreation {
                error_type,
                message,
            } => {
                let ty = error_type
                    .as_deref()
                    .and_then(exception_type)
                    .unwrap_or("Exception");
                let args = match message {
                    Some(message) => vec![self.expr(message)],
                    None => Vec::new(),
                };
                Expr::construct(ty, args)
            }
            other => self.unsupported(other.kind()),
        }
    }

    /// Calls on JS globals: `console.log`, `Math.floor`, `JSON.stringify`...
    pub(super) fn global_call(&mut self, owner: &str, method: &str, arguments: &[Node]) -> Option<Expr> {
        if self.is_local(owner) {
            return None;
        }
        let first = arguments.first();
        Some(match (owner, method) {
            ("console", "log" | "info" | "debug") => self.debug_output(arguments, DebugLevel::Log),
            ("console", "warn" | "error") => self.debug_output(arguments, DebugLevel::Error),
            ("Math", "floor") => self.rounding("Floor", first?),
            ("Math", "ceil") => self.rounding("Ceiling", first?),
            ("Math", "round") => self.rounding("Round", first?),
            ("Math", "trunc") => self.rounding("Truncate", first?),
            ("Math", "min") => self.min_max("Min", arguments),
            ("Math", "max") => self.min_max("Max", arguments),
            ("Math", "random") => Expr::name("Random.Shared").method("NextDouble", Vec::new()),
            ("Math", "imul") => {
                let [a, b] = arguments else {
                    return None;
                };
                let a = Expr::cast("int", self.expr(a));
                let b = Expr::cast("int", self.expr(b));
                Expr::Unchecked(Box::new(Expr::bin(Op::Mul, a, b)))
            }
            ("Math", "clz32") => {
                self.using("System.Numerics");
                let value = Expr::cast("uint", self.expr(first?));
                Expr::call_path("BitOperations.LeadingZeroCount", vec![value])
            }
            ("Math", "abs" | "sqrt" | "log" | "log2" | "log10" | "sin" | "cos" | "tan" | "exp" | "pow" | "atan2") => {
                let mut name = method.to_string();
                name[..1].make_ascii_uppercase();
                Expr::call_path(&format!("Math.{name}"), self.arguments(arguments))
            }
            ("JSON", "stringify") => {
                self.using("System.Text.Json");
                Expr::call_path("JsonSerializer.Serialize", vec![self.expr(first?)])
            }
            ("JSON", "parse") => {
                self.using("System.Text.Json");
                Expr::call_path("JsonSerializer.Deserialize<dynamic>", vec![self.expr(first?)])
            }
            ("Object", "keys") => self.map_keys(first?, false),
            ("Object", "values") => self.map_keys(first?, true),
            ("Object", "entries") => self.map_entries(first?),
            ("Object", "freeze") => self.expr(first?),
            ("Object", "assign") => self.unsupported("Object.assign"),
            ("Array", "isArray") => {
                return Some(self.semantic(&Node::IsArray {
                    value: Box::new(first?.clone()),
                }));
            }
            ("Array", "from") => self.sequence(first?).method("ToList", Vec::new()),
            ("Array", "of") => {
                let items = self.arguments(arguments);
                Expr::New {
                    ty: "List<dynamic>".to_string(),
                    args: Vec::new(),
                    init: Some(Initializer::Items(items)),
                }
            }
            ("String", "fromCharCode") => self.from_char_codes(arguments),
            ("Number", "isInteger") => {
                let value = self.expr(first?);
                Expr::bin(Op::Eq, Expr::bin(Op::Mod, value, Expr::int(1)), Expr::int(0))
            }
            ("Number", "parseInt") => return self.builtin_call("parseInt", arguments),
            ("Number", "parseFloat") => return self.builtin_call("parseFloat", arguments),
            _ => return None,
        })
    }

    /// Calls on bare JS builtin functions.
    pub(super) fn builtin_call(&mut self, name: &str, arguments: &[Node]) -> Option<Expr> {
        if self.is_local(name) {
            return None;
        }
        let first = arguments.first();
        Some(match name {
            "parseInt" => self.parse_integer(first?, arguments.get(1)),
            "parseFloat" => {
                return Some(self.semantic(&Node::ParseFloat {
                    string: Box::new(first?.clone()),
                }));
            }
            "String" => Expr::call_path("Convert.ToString", vec![self.expr(first?)]),
            "Number" => Expr::call_path("Convert.ToDouble", vec![self.expr(first?)]),
            "Boolean" => Expr::call_path("Convert.ToBoolean", vec![self.expr(first?)]),
            "isNaN" => Expr::call_path("double.IsNaN", vec![self.expr(first?)]),
            "isFinite" => Expr::call_path("double.IsFinite", vec![self.expr(first?)]),
            "Array" if arguments.len() == 1 && int_literal(&arguments[0]).is_some() => {
                let size = self.expr(&arguments[0]);
                Expr::call_path("Enumerable.Repeat<dynamic>", vec![Expr::null(), size])
                    .method("ToList", Vec::new())
            }
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::csharp::CSharpOptions;
    use crate::traits::Transformer;
    use retarget_il::Program;
    use retarget_il::build::*;

    /// Lower `node` as the value of a local inside a function body.
    fn lower_expr(node: Node) -> (Expr, Vec<String>) {
        let mut transformer = CSharpTransformer::new(CSharpOptions::default());
        let unit = transformer.transform(&Program::new(vec![function_decl(
            "f",
            &["x"],
            vec![const_decl("r", node)],
        )]));
        let value = unit
            .program
            .members
            .iter()
            .find_map(|member| match member {
                Member::Method(method) => method.body.iter().find_map(|stmt| match stmt {
                    Stmt::Local { value, .. } => value.clone(),
                    _ => None,
                }),
                _ => None,
            })
            .expect("lowered value");
        (value, unit.usings)
    }

    #[test]
    fn test_rotation_uses_bit_operations() {
        let (value, usings) = lower_expr(Node::RotateLeft {
            value: Box::new(ident("x")),
            amount: Box::new(int(39)),
            bits: 32,
        });
        assert_eq!(
            value,
            Expr::call_path(
                "BitOperations.RotateLeft",
                vec![Expr::cast("uint", Expr::name("x")), Expr::int(7)]
            )
        );
        assert!(usings.iter().any(|u| u == "System.Numerics"));
    }

    #[test]
    fn test_byte_rotation_is_spelled_out() {
        let (value, _) = lower_expr(Node::RotateRight {
            value: Box::new(ident("x")),
            amount: Box::new(int(3)),
            bits: 8,
        });
        assert!(matches!(value, Expr::Cast { ref ty, .. } if ty == "byte"));
    }

    #[test]
    fn test_floor_of_integer_is_identity() {
        let (value, _) = lower_expr(Node::MathFloor {
            argument: Box::new(typed_ident("n", "int32")),
        });
        assert_eq!(value, Expr::name("n"));
    }

    #[test]
    fn test_pack_bytes_big_endian() {
        let (value, _) = lower_expr(Node::PackBytes {
            bytes: vec![ident("a"), ident("b")],
            bits: 16,
            endian: Endian::Big,
        });
        let expected = Expr::cast(
            "ushort",
            Expr::bin(
                Op::BitOr,
                Expr::bin(Op::Shl, Expr::cast("ushort", Expr::name("a")), Expr::int(8)),
                Expr::cast("ushort", Expr::name("b")),
            ),
        );
        assert_eq!(value, expected);
    }

    #[test]
    fn test_untyped_receivers_are_cast_for_linq() {
        let (value, _) = lower_expr(Node::ArrayMap {
            array: Box::new(ident("x")),
            callback: Box::new(arrow(&["v"], ident("v"))),
        });
        let Expr::Call { func, .. } = value else {
            panic!("expected a call");
        };
        let Expr::Member { object, name } = *func else {
            panic!("expected ToList");
        };
        assert_eq!(name, "ToList");
        assert!(matches!(*object, Expr::Call { ref func, .. }
            if matches!(func.as_ref(), Expr::Member { object, name }
                if name == "Select" && matches!(object.as_ref(), Expr::Cast { ty, .. } if ty == "IEnumerable<dynamic>"))));
    }

    #[test]
    fn test_text_encodings_import_system_text() {
        let (value, usings) = lower_expr(Node::StringToBytes {
            string: Box::new(ident("x")),
            encoding: None,
        });
        assert_eq!(
            value,
            Expr::name("Encoding")
                .member("UTF8")
                .method("GetBytes", vec![Expr::name("x")])
        );
        assert!(usings.iter().any(|u| u == "System.Text"));
    }

    #[test]
    fn test_helpers_are_appended_once() {
        let mut transformer = CSharpTransformer::new(CSharpOptions::default());
        let pop = || {
            expr_stmt(Node::ArrayPop {
                array: Box::new(ident("xs")),
            })
        };
        let unit = transformer.transform(&Program::new(vec![
            const_decl("xs", array(vec![int(1)])),
            pop(),
            pop(),
        ]));
        let helpers = unit
            .program
            .members
            .iter()
            .filter(|member| matches!(member, Member::Verbatim(_)))
            .count();
        assert_eq!(helpers, 1);
    }

    fn callee(value: &Expr) -> &str {
        match value {
            Expr::Call { func, .. } => match func.as_ref() {
                Expr::Name(name) => name.rsplit('.').next().unwrap_or(name),
                other => panic!("expected a named callee, got {other:?}"),
            },
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn test_substring_goes_through_clamping_helper() {
        let (value, _) = lower_expr(Node::StringSubstring {
            string: Box::new(string("hello")),
            start: Box::new(int(3)),
            end: Some(Box::new(int(1))),
        });
        assert_eq!(callee(&value), "Substring");
    }

    #[test]
    fn test_pad_keeps_pad_left_for_one_char() {
        let (value, _) = lower_expr(Node::StringPadStart {
            string: Box::new(ident("x")),
            length: Box::new(int(4)),
            fill: Some(Box::new(string("0"))),
        });
        assert_eq!(value, Expr::name("x").method("PadLeft", vec![Expr::int(4), Expr::Char('0')]));
    }

    #[test]
    fn test_pad_with_long_fill_uses_helper() {
        let (value, _) = lower_expr(Node::StringPadStart {
            string: Box::new(string("abc")),
            length: Box::new(int(6)),
            fill: Some(Box::new(string("xy"))),
        });
        assert_eq!(callee(&value), "PadStart");
        let Expr::Call { args, .. } = &value else {
            unreachable!()
        };
        assert_eq!(args[2], Expr::Str("xy".into()));
        assert!(Helper::PadStart.source().contains("padding.ToString(0, missing)"));

        let (value, _) = lower_expr(Node::StringPadEnd {
            string: Box::new(string("abc")),
            length: Box::new(int(6)),
            fill: Some(Box::new(ident("fill"))),
        });
        assert_eq!(callee(&value), "PadEnd");
    }

    #[test]
    fn test_char_at_is_bounds_checked() {
        let (value, _) = lower_expr(Node::StringCharAt {
            string: Box::new(ident("x")),
            index: Box::new(int(5)),
        });
        assert_eq!(callee(&value), "CharAt");
        let (value, _) = lower_expr(Node::StringCharCodeAt {
            string: Box::new(ident("x")),
            index: Box::new(int(0)),
        });
        assert_eq!(value, Expr::cast("int", Expr::name("x").index(Expr::int(0))));
    }

    #[test]
    fn test_zero_width_rotation_degrades_locally() {
        let (value, _) = lower_expr(Node::RotateLeft {
            value: Box::new(ident("x")),
            amount: Box::new(int(1)),
            bits: 0,
        });
        assert_eq!(value, Expr::Placeholder("0-bit rotation".into()));
    }
}
