//! Semantic operations and JS globals in C++ spelling.
//!
//! The standard library covers most operations directly. The rest go
//! through small helpers in `namespace rt` (see `runtime`), which keep JS
//! behavior for negative indices and missing arguments.

use super::ast::*;
use super::runtime::Helper;
use super::transform::{CppTransformer, exception_type, int_literal, is_container};
use crate::precedence::Op;
use crate::types::{Primitive, TypeRef, parse_il_type};
use retarget_il::{DebugLevel, Endian, Node, NumericType};

/// Fixed-width spelling of a numeric IL type.
fn numeric(ty: NumericType) -> &'static str {
    match ty {
        NumericType::Int8 => "int8_t",
        NumericType::Uint8 => "uint8_t",
        NumericType::Int16 => "int16_t",
        NumericType::Uint16 => "uint16_t",
        NumericType::Int32 => "int32_t",
        NumericType::Uint32 => "uint32_t",
        NumericType::Int64 => "int64_t",
        NumericType::Uint64 => "uint64_t",
        NumericType::Float32 => "float",
        NumericType::Float64 => "double",
    }
}

fn unsigned_of_width(bits: u32) -> &'static str {
    match bits {
        8 => "uint8_t",
        16 => "uint16_t",
        64 => "uint64_t",
        _ => "uint32_t",
    }
}

impl CppTransformer {
    /// Semantic operations that read best as statements of their own.
    pub(super) fn semantic_statement(&mut self, node: &Node) -> Option<Vec<Stmt>> {
        let statement = match node {
            Node::ArrayReverse { array } => {
                let value = self.expr(array);
                let [begin, end] = value.range();
                Expr::call_path("std::reverse", vec![begin, end])
            }
            Node::ArraySort {
                array,
                compare: None,
            } => {
                let value = self.expr(array);
                let [begin, end] = value.range();
                Expr::call_path("std::sort", vec![begin, end])
            }
            Node::ArrayForEach { array, callback } => return self.for_each_callback(array, callback),
            _ => return None,
        };
        Some(vec![Stmt::Expr(statement)])
    }

    /// `forEach` with an inline callback, as a loop. Callbacks that `return`
    /// early keep their lambda and are invoked per element.
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
        let items = self.expr(array);

        let mut out = Vec::new();
        let source = if items.is_simple() {
            items
        } else {
            let temp = self.temp("_items");
            out.push(Stmt::Local {
                ty: "auto".to_string(),
                name: temp.clone(),
                value: Some(items),
            });
            Expr::Name(temp)
        };

        if returns {
            let action = self.temp("_each");
            out.push(Stmt::Local {
                ty: "auto".to_string(),
                name: action.clone(),
                value: Some(self.lambda(function)),
            });
            let index = self.temp("_i");
            let mut args = vec![source.clone().index(Expr::name(&index))];
            if names.len() == 2 {
                args.push(Expr::name(&index));
            }
            out.push(self.counted_loop(
                &index,
                &source,
                vec![Stmt::Expr(Expr::call(Expr::Name(action), args))],
            ));
            return Some(out);
        }

        let body = |this: &mut Self| {
            if function.expression {
                this.in_loop(|this| this.expression_statement(&function.body))
            } else {
                this.in_loop(|this| this.block(function.body_statements()))
            }
        };
        match names.as_slice() {
            [item, index] => {
                self.declare(item, element);
                self.declare(index, TypeRef::INT);
                let index = self.ident(index);
                let mut looped = vec![Stmt::Local {
                    ty: "auto".to_string(),
                    name: self.ident(item),
                    value: Some(source.clone().index(Expr::name(&index))),
                }];
                looped.extend(body(self));
                out.push(self.counted_loop(&index, &source, looped));
            }
            names => {
                let name = match names.first() {
                    Some(item) => {
                        self.declare(item, element);
                        self.ident(item)
                    }
                    None => self.temp("_item"),
                };
                let looped = body(self);
                out.push(Stmt::ForEach {
                    ty: "auto".to_string(),
                    name,
                    iter: source,
                    body: looped,
                });
            }
        }
        Some(out)
    }

    /// `for (int i = 0; i < length(items); ++i)`
    fn counted_loop(&self, index: &str, items: &Expr, body: Vec<Stmt>) -> Stmt {
        Stmt::For {
            init: vec![Stmt::Local {
                ty: "int".to_string(),
                name: index.to_string(),
                value: Some(Expr::int(0)),
            }],
            test: Some(Expr::bin(Op::Lt, Expr::name(index), self.length(items.clone()))),
            update: vec![Expr::unary(UnaryOp::PreIncrement, Expr::name(index))],
            body,
        }
    }

    /// A callback for an algorithm. Inline functions become lambdas;
    /// named functions are wrapped so templates and overloads resolve.
    fn callback(&mut self, node: &Node, arity: usize) -> Expr {
        if let Some(function) = node.as_inline_function() {
            return self.lambda(function);
        }
        let capture = self.capture();
        let func = self.expr(node);
        let params: Vec<Param> = (0..arity)
            .map(|i| Param {
                ty: "auto".to_string(),
                name: format!("_a{i}"),
                default: None,
            })
            .collect();
        let args = params.iter().map(|param| Expr::name(&param.name)).collect();
        Expr::Lambda {
            capture,
            params,
            body: LambdaBody::Expr(Box::new(Expr::call(func, args))),
        }
    }

    fn rounding(&mut self, function: &str, argument: &Node) -> Expr {
        if self.is_integer(argument) {
            return self.expr(argument);
        }
        let value = self.expr(argument);
        let value = match function {
            "round" => Expr::call_path("std::floor", vec![Expr::bin(Op::Add, value, Expr::literal("0.5"))]),
            other => Expr::call_path(&format!("std::{other}"), vec![value]),
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
        if self.options.standard.is_cpp20() {
            let function = if left { "std::rotl" } else { "std::rotr" };
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
        let source = self.type_of(expression).and_then(|ty| ty.primitive());
        let value = self.expr(expression);
        if source == Some(Primitive::from(target)) {
            return value;
        }
        Expr::cast(numeric(target), value)
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
        // Narrow operands promote to int.
        if bits < 32 {
            Expr::cast(ty, combined)
        } else {
            combined
        }
    }

    fn unpack_bytes(&mut self, value: &Node, bits: u32, endian: Endian) -> Expr {
        let width = (bits / 8).max(1) as i64;
        let value = self.expr(value);
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
                    Expr::cast("uint8_t", shifted)
                })
                .collect();
            return Expr::init("std::vector<uint8_t>", items);
        }
        let helper = self.helper(Helper::UnpackBytes);
        let big_endian = matches!(endian, Endian::Big);
        Expr::call(
            helper,
            vec![
                Expr::cast("uint64_t", value),
                Expr::int(width),
                Expr::literal(big_endian.to_string()),
            ],
        )
    }

    fn typed_array(&mut self, element: NumericType, size: Option<&Node>, source: Option<&Node>) -> Expr {
        let element_ty = numeric(element);
        let ty = format!("std::vector<{element_ty}>");
        match (size, source) {
            (_, Some(Node::ArrayExpression { elements })) => {
                let items = elements
                    .iter()
                    .map(|item| match item {
                        Some(item @ Node::Literal(_)) => self.expr(item),
                        Some(item) => {
                            let value = self.expr(item);
                            Expr::cast(element_ty, value)
                        }
                        None => Expr::int(0),
                    })
                    .collect();
                Expr::init(&ty, items)
            }
            (_, Some(source)) => {
                let value = self.expr(source);
                Expr::construct(&ty, value.range().into())
            }
            // A source that arrived in the size slot.
            (Some(size), None) if self.type_of(size).is_some_and(|t| is_container(&t)) => {
                self.typed_array(element, None, Some(size))
            }
            (Some(size), None) => {
                let size = self.expr(size);
                Expr::construct(&ty, vec![size])
            }
            (None, None) => Expr::init(&ty, Vec::new()),
        }
    }

    fn encode(&mut self, encoding: Option<&str>, value: &Node, to_bytes: bool) -> Expr {
        let encoding = encoding.map(str::to_ascii_lowercase);
        let helper = match (encoding.as_deref(), to_bytes) {
            (Some("hex"), true) => Helper::HexDecode,
            (Some("hex"), false) => Helper::HexEncode,
            (Some("base64"), true) => Helper::Base64Decode,
            (Some("base64"), false) => Helper::Base64Encode,
            (_, true) => Helper::ToBytes,
            (_, false) => {
                let bytes = self.expr(value);
                return Expr::construct("std::string", bytes.range().into());
            }
        };
        let value = self.expr(value);
        Expr::call(self.helper(helper), vec![value])
    }

    fn from_char_codes(&mut self, codes: &[Node]) -> Expr {
        let helper = self.helper(Helper::FromCharCodes);
        match codes {
            [Node::SpreadElement { argument }] => {
                let codes = self.expr(argument);
                Expr::call(helper, vec![codes])
            }
            [code] => {
                let code = self.expr(code);
                Expr::construct("std::string", vec![Expr::int(1), Expr::cast("char", code)])
            }
            codes => {
                let items = codes.iter().map(|code| self.expr(code)).collect();
                Expr::call(helper, vec![Expr::init("std::vector<int>", items)])
            }
        }
    }

    fn min_max(&mut self, function: &str, arguments: &[Node]) -> Expr {
        match arguments {
            [Node::SpreadElement { argument }] => {
                let items = self.expr(argument);
                let [begin, end] = items.range();
                let path = format!("std::{function}_element");
                Expr::unary(UnaryOp::Deref, Expr::call_path(&path, vec![begin, end]))
            }
            [] => {
                let infinity = Expr::call_path("std::numeric_limits<double>::infinity", Vec::new());
                if function == "min" {
                    infinity
                } else {
                    Expr::unary(UnaryOp::Neg, infinity)
                }
            }
            [single] => self.expr(single),
            [first, rest @ ..] => {
                let path = format!("std::{function}");
                let first = self.expr(first);
                rest.iter().fold(first, |acc, next| {
                    let next = self.expr(next);
                    Expr::call_path(&path, vec![acc, next])
                })
            }
        }
    }

    /// Stream output; values without `operator<<` go through `rt::to_string`.
    fn debug_output(&mut self, arguments: &[Node], level: DebugLevel) -> Expr {
        let stream = match level {
            DebugLevel::Log | DebugLevel::Info => "std::cout",
            DebugLevel::Warn | DebugLevel::Error => "std::cerr",
        };
        let mut out = Expr::name(stream);
        for (i, argument) in arguments.iter().enumerate() {
            if i > 0 {
                out = Expr::bin(Op::Shl, out, Expr::Char(' '));
            }
            let primitive = self.type_of(argument).and_then(|ty| ty.primitive());
            let printable = self.is_stringy(argument)
                || primitive.is_some_and(|p| p.is_numeric() || p == Primitive::Bool);
            let value = match primitive {
                // `int8_t` and `uint8_t` stream as characters.
                Some(Primitive::Int8 | Primitive::UInt8) => Expr::cast("int", self.expr(argument)),
                _ if printable => self.expr(argument),
                _ => self.stringify(argument),
            };
            out = Expr::bin(Op::Shl, out, value);
        }
        Expr::bin(Op::Shl, out, Expr::Char('\n'))
    }

    fn parse_integer(&mut self, string: &Node, radix: Option<&Node>) -> Expr {
        let value = self.expr(string);
        match radix.map(|radix| (int_literal(radix), radix)) {
            None | Some((Some(10), _)) => Expr::call_path("std::stoi", vec![value]),
            Some((Some(radix), _)) => {
                Expr::call_path("std::stoll", vec![value, Expr::null(), Expr::int(radix)])
            }
            Some((None, radix)) => {
                let radix = self.expr(radix);
                Expr::call_path("std::stoll", vec![value, Expr::null(), radix])
            }
        }
    }

    fn is_integer_value(&mut self, value: &Node) -> Expr {
        if self.is_integer(value) {
            return Expr::literal("true");
        }
        let value = self.expr(value);
        Expr::bin(Op::Eq, Expr::call_path("std::trunc", vec![value.clone()]), value)
    }

    fn starts_or_ends(&mut self, string: &Node, search: &Node, starts: bool) -> Expr {
        let text = self.expr(string);
        let search = self.expr(search);
        if self.options.standard.is_cpp20() {
            return text.method(if starts { "starts_with" } else { "ends_with" }, vec![search]);
        }
        let helper = self.helper(if starts { Helper::StartsWith } else { Helper::EndsWith });
        Expr::call(helper, vec![text, search])
    }

    fn is_set(&self, node: &Node) -> bool {
        matches!(self.type_of(node), Some(TypeRef::Named { name, .. }) if name == "Set")
    }

    pub(super) fn semantic(&mut self, node: &Node) -> Expr {
        match node {
            // ------------------------------------------------------------ arrays
            Node::ArrayLength { array } => {
                let value = self.expr(array);
                self.length(value)
            }
            Node::ArrayPush { array, values } => {
                let target = self.expr(array);
                match values.as_slice() {
                    [Node::SpreadElement { argument }] => {
                        let items = self.expr(argument);
                        let [begin, end] = items.range();
                        let at = target.clone().method("end", Vec::new());
                        target.method("insert", vec![at, begin, end])
                    }
                    [single] => {
                        let value = self.expr(single);
                        if self.is_set(array) {
                            target.method("insert", vec![value])
                        } else {
                            target.method("push_back", vec![value])
                        }
                    }
                    many => {
                        let items = self.arguments(many);
                        let at = target.clone().method("end", Vec::new());
                        target.method("insert", vec![at, Expr::init("", items)])
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
                let at = target.clone().method("begin", Vec::new());
                match values.as_slice() {
                    [single] if !matches!(single, Node::SpreadElement { .. }) => {
                        let value = self.expr(single);
                        target.method("insert", vec![at, value])
                    }
                    many => {
                        let items = self.arguments(many);
                        target.method("insert", vec![at, Expr::init("", items)])
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
                Expr::call(helper, args)
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
                    None if !items.is_empty() => args.push(Expr::name("std::nullopt")),
                    None => {}
                }
                if !items.is_empty() {
                    let items = self.arguments(items);
                    args.push(Expr::init("", items));
                }
                Expr::call(helper, args)
            }
            Node::ArrayConcat { array, others } => {
                let helper = self.helper(Helper::Concat);
                let mut args = vec![self.expr(array)];
                args.extend(others.iter().map(|other| self.expr(other)));
                Expr::call(helper, args)
            }
            Node::ArrayIndexOf { array, value } => {
                let helper = self.helper(Helper::IndexOf);
                let items = self.expr(array);
                Expr::call(helper, vec![items, self.expr(value)])
            }
            Node::ArrayIncludes { array, value } => {
                if self.is_set(array) {
                    let set = self.expr(array);
                    let value = self.expr(value);
                    return self.contains(set, value);
                }
                let helper = self.helper(Helper::IndexOf);
                let items = self.expr(array);
                let found = Expr::call(helper, vec![items, self.expr(value)]);
                Expr::bin(Op::Ge, found, Expr::int(0))
            }
            Node::ArrayJoin { array, separator } => {
                let helper = self.helper(Helper::Join);
                let mut args = vec![self.expr(array)];
                if let Some(separator) = separator {
                    args.push(self.expr(separator));
                }
                Expr::call(helper, args)
            }
            Node::ArrayReverse { array } => {
                let helper = self.helper(Helper::Reverse);
                Expr::call(helper, vec![self.expr(array)])
            }
            Node::ArraySort { array, compare } => {
                let helper = self.helper(Helper::Sort);
                let mut args = vec![self.expr(array)];
                if let Some(compare) = compare {
                    args.push(self.callback(compare, 2));
                }
                Expr::call(helper, args)
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
                    let element = match element_type {
                        Some(element) => parse_il_type(element),
                        None => self.type_of(value).unwrap_or(TypeRef::ANY),
                    };
                    let ty = self.ty(&TypeRef::list(element.clone()));
                    let size = self.expr(size);
                    let value = self.expr_as(value, &element);
                    Expr::construct(&ty, vec![size, value])
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
                let helper = self.helper(Helper::Map);
                let items = self.expr(array);
                Expr::call(helper, vec![items, self.callback(callback, 1)])
            }
            Node::ArrayFilter { array, callback } => {
                let helper = self.helper(Helper::Filter);
                let items = self.expr(array);
                Expr::call(helper, vec![items, self.callback(callback, 1)])
            }
            Node::ArrayFind { array, callback } => {
                let helper = self.helper(Helper::Find);
                let items = self.expr(array);
                Expr::call(helper, vec![items, self.callback(callback, 1)])
            }
            Node::ArrayForEach { array, callback } => {
                let items = self.expr(array);
                let [begin, end] = items.range();
                let callback = self.callback(callback, 1);
                Expr::call_path("std::for_each", vec![begin, end, callback])
            }
            Node::ArrayEvery { array, callback } | Node::ArraySome { array, callback } => {
                let path = if matches!(node, Node::ArrayEvery { .. }) {
                    "std::all_of"
                } else {
                    "std::any_of"
                };
                let items = self.expr(array);
                let [begin, end] = items.range();
                let callback = self.callback(callback, 1);
                Expr::call_path(path, vec![begin, end, callback])
            }
            Node::ArrayReduce {
                array,
                callback,
                initial,
            } => {
                let items = self.expr(array);
                match initial {
                    Some(initial) => {
                        let [begin, end] = items.range();
                        let seed = self.expr(initial);
                        let callback = self.callback(callback, 2);
                        Expr::call_path("std::accumulate", vec![begin, end, seed, callback])
                    }
                    None => {
                        let helper = self.helper(Helper::Reduce);
                        Expr::call(helper, vec![items, self.callback(callback, 2)])
                    }
                }
            }
            Node::ArrayCreation { size, element_type } => {
                let element = element_type
                    .as_deref()
                    .map(parse_il_type)
                    .unwrap_or(TypeRef::ANY);
                let ty = self.ty(&TypeRef::list(element));
                match size {
                    Some(size) => {
                        let size = self.expr(size);
                        Expr::construct(&ty, vec![size])
                    }
                    None => Expr::init(&ty, Vec::new()),
                }
            }
            Node::TypedArrayCreation {
                element_type,
                size,
                source,
            } => self.typed_array(*element_type, size.as_deref(), source.as_deref()),
            Node::ArrayFrom { iterable } => {
                if self.is_stringy(iterable) {
                    let text = self.expr(iterable);
                    return Expr::call(self.helper(Helper::Chars), vec![text]);
                }
                let items = self.expr(iterable);
                Expr::construct("std::vector", items.range().into())
            }
            Node::ArrayClear { array } => self.expr(array).method("clear", Vec::new()),
            Node::ArrayUnique { array } => {
                let helper = self.helper(Helper::Unique);
                Expr::call(helper, vec![self.expr(array)])
            }
            Node::ArrayXor { left, right } => {
                let helper = self.helper(Helper::XorBytes);
                let left = self.expr(left);
                Expr::call(helper, vec![left, self.expr(right)])
            }
            // Containers copy by value.
            Node::CopyArray { array } => self.expr(array),

            // ----------------------------------------------------------- strings
            Node::StringLength { string } => {
                let text = self.expr(string);
                self.length(text)
            }
            Node::StringSplit { string, separator } => {
                let text = self.expr(string);
                match separator.as_deref() {
                    None => Expr::init("std::vector<std::string>", vec![text]),
                    Some(separator) if separator.as_string_literal() == Some("") => {
                        Expr::call(self.helper(Helper::Chars), vec![text])
                    }
                    Some(separator) => {
                        let separator = self.expr(separator);
                        Expr::call(self.helper(Helper::Split), vec![text, separator])
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
                let helper = self.helper(Helper::IndexOf);
                let text = self.expr(string);
                Expr::call(helper, vec![text, self.stringify(search)])
            }
            Node::StringReplace {
                string,
                search,
                replacement,
                all,
            } => {
                let helper = self.helper(if *all {
                    Helper::ReplaceAll
                } else {
                    Helper::ReplaceFirst
                });
                let text = self.expr(string);
                let search = self.expr(search);
                let replacement = self.expr(replacement);
                Expr::call(helper, vec![text, search, replacement])
            }
            Node::StringToUpper { string } => {
                let helper = self.helper(Helper::ToUpper);
                Expr::call(helper, vec![self.expr(string)])
            }
            Node::StringToLower { string } => {
                let helper = self.helper(Helper::ToLower);
                Expr::call(helper, vec![self.expr(string)])
            }
            Node::StringTrim { string } => {
                let helper = self.helper(Helper::Trim);
                Expr::call(helper, vec![self.expr(string)])
            }
            Node::StringStartsWith { string, search } => self.starts_or_ends(string, search, true),
            Node::StringEndsWith { string, search } => self.starts_or_ends(string, search, false),
            Node::StringIncludes { string, search } => {
                let text = self.expr(string);
                let found = text.method("find", vec![self.expr(search)]);
                Expr::bin(Op::Ne, found, Expr::name("std::string::npos"))
            }
            Node::StringRepeat { string, count } => {
                let helper = self.helper(Helper::Repeat);
                let text = self.expr(string);
                Expr::call(helper, vec![text, self.expr(count)])
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
                let helper = self.helper(if matches!(node, Node::StringPadStart { .. }) {
                    Helper::PadStart
                } else {
                    Helper::PadEnd
                });
                let text = self.expr(string);
                let length = Expr::cast("std::size_t", self.expr(length));
                let mut args = vec![text, length];
                if let Some(fill) = fill {
                    args.push(self.expr(fill));
                }
                Expr::call(helper, args)
            }
            Node::StringCharAt { string, index } => {
                let text = self.expr(string);
                let index = self.expr(index);
                Expr::construct("std::string", vec![Expr::int(1), text.index(index)])
            }
            Node::StringCharCodeAt { string, index } => {
                let text = self.expr(string);
                let index = self.expr(index);
                Expr::cast("int", Expr::cast("unsigned char", text.index(index)))
            }
            Node::StringFromCharCodes { codes } => self.from_char_codes(codes),
            Node::StringConcat { parts } => {
                let mut parts = parts.iter();
                let first = match parts.next() {
                    Some(part) => {
                        let value = self.stringify(part);
                        Expr::construct("std::string", vec![value])
                    }
                    None => Expr::construct("std::string", Vec::new()),
                };
                parts.fold(first, |acc, part| {
                    let part = self.stringify(part);
                    Expr::bin(Op::Add, acc, part)
                })
            }
            Node::StringToBytes { string, encoding } => self.encode(encoding.as_deref(), string, true),
            Node::BytesToString { bytes, encoding } => self.encode(encoding.as_deref(), bytes, false),

            // -------------------------------------------------------------- math
            Node::MathFloor { argument } => self.rounding("floor", argument),
            Node::MathCeil { argument } => self.rounding("ceil", argument),
            Node::MathRound { argument } => self.rounding("round", argument),
            Node::MathTrunc { argument } => self.rounding("trunc", argument),
            Node::MathAbs { argument } => {
                let value = self.expr(argument);
                Expr::call_path("std::abs", vec![value])
            }
            Node::MathMin { arguments } => self.min_max("min", arguments),
            Node::MathMax { arguments } => self.min_max("max", arguments),
            Node::MathPow { base, exponent } => {
                let base = self.expr(base);
                Expr::call_path("std::pow", vec![base, self.expr(exponent)])
            }
            Node::MathSqrt { argument } => {
                let value = self.expr(argument);
                Expr::call_path("std::sqrt", vec![value])
            }
            Node::MathRandom {} => Expr::call(self.helper(Helper::Random), Vec::new()),
            Node::MathSign { argument } => {
                let value = self.expr(argument);
                let positive = Expr::bin(Op::Gt, value.clone(), Expr::int(0));
                let negative = Expr::bin(Op::Lt, value, Expr::int(0));
                Expr::bin(Op::Sub, positive, negative)
            }
            Node::MathLog { argument } => {
                let value = self.expr(argument);
                Expr::call_path("std::log", vec![value])
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
                let value = self.expr(string);
                Expr::call_path("std::stod", vec![value])
            }
            Node::NumberToString { value, radix } => {
                match radix.as_deref().map(|radix| (int_literal(radix), radix)) {
                    None | Some((Some(10), _)) => self.stringify(value),
                    Some((known, radix)) => {
                        let helper = self.helper(Helper::ToRadix);
                        let number = Expr::cast("long long", self.expr(value));
                        let radix = match known {
                            Some(radix) => Expr::int(radix),
                            None => self.expr(radix),
                        };
                        Expr::call(helper, vec![number, radix])
                    }
                }
            }
            Node::IsInteger { value } => self.is_integer_value(value),

            // --------------------------------------------------------- encodings
            Node::HexEncode { bytes } => self.encode(Some("hex"), bytes, false),
            Node::HexDecode { string } => self.encode(Some("hex"), string, true),
            Node::Base64Encode { bytes } => self.encode(Some("base64"), bytes, false),
            Node::Base64Decode { string } => self.encode(Some("base64"), string, true),

            // -------------------------------------------------------------- maps
            Node::MapCreation { entries } => {
                self.dictionary(entries, &TypeRef::map(TypeRef::STRING, TypeRef::ANY))
            }
            Node::MapGet { map, key } => {
                let target = self.expr(map);
                target.index(self.expr(key))
            }
            Node::MapSet { map, key, value } => {
                let value_type = match self.type_of(map) {
                    Some(TypeRef::Named { args, .. }) => args.get(1).cloned().unwrap_or(TypeRef::ANY),
                    _ => TypeRef::ANY,
                };
                let target = self.expr(map);
                let key = self.expr(key);
                let value = self.expr_as(value, &value_type);
                Expr::assign(target.index(key), value)
            }
            Node::MapHas { map, key } => {
                let target = self.expr(map);
                let key = self.expr(key);
                self.contains(target, key)
            }
            Node::MapDelete { map, key } => {
                let target = self.expr(map);
                target.method("erase", vec![self.expr(key)])
            }
            Node::MapKeys { map } => {
                let helper = self.helper(Helper::Keys);
                Expr::call(helper, vec![self.expr(map)])
            }
            Node::MapValues { map } => {
                let helper = self.helper(Helper::Values);
                Expr::call(helper, vec![self.expr(map)])
            }
            Node::MapEntries { map } => {
                let helper = self.helper(Helper::Entries);
                Expr::call(helper, vec![self.expr(map)])
            }
            Node::MapSize { map } => {
                let target = self.expr(map);
                self.length(target)
            }
            Node::ObjectFreeze { object } => self.expr(object),
            Node::IsArray { value } => match self.type_of(value) {
                Some(ty) if ty.is_list() || ty.is_array() => Expr::literal("true"),
                Some(ty) if !ty.is_any() => Expr::literal("false"),
                _ => {
                    let value = self.expr(value);
                    let held = value.method("type", Vec::new());
                    let list = Expr::name("typeid(std::vector<std::any>)");
                    Expr::bin(Op::Eq, held, list)
                }
            },

            // -------------------------------------------------------------- misc
            Node::DebugOutput { arguments, level } => self.debug_output(arguments, *level),
            Node::ErrorCreation {
                error_type,
                message,
            } => {
                let ty = error_type
                    .as_deref()
                    .and_then(exception_type)
                    .unwrap_or("std::runtime_error");
                let message = match message {
                    Some(message) => self.stringify(message),
                    None => Expr::Str(String::new()),
                };
                Expr::construct(ty, vec![message])
            }
            other => self.unsupported(other.kind()),
        }
    }

    /// Calls on JS globals: `console.log`, `Math.floor`, `Object.keys`...
    pub(super) fn global_call(&mut self, owner: &str, method: &str, arguments: &[Node]) -> Option<Expr> {
        if self.is_local(owner) {
            return None;
        }
        let first = arguments.first();
        Some(match (owner, method) {
            ("console", "log" | "info" | "debug") => self.debug_output(arguments, DebugLevel::Log),
            ("console", "warn" | "error") => self.debug_output(arguments, DebugLevel::Error),
            ("Math", "floor") => self.rounding("floor", first?),
            ("Math", "ceil") => self.rounding("ceil", first?),
            ("Math", "round") => self.rounding("round", first?),
            ("Math", "trunc") => self.rounding("trunc", first?),
            ("Math", "min") => self.min_max("min", arguments),
            ("Math", "max") => self.min_max("max", arguments),
            ("Math", "random") => Expr::call(self.helper(Helper::Random), Vec::new()),
            ("Math", "imul") => {
                let [a, b] = arguments else {
                    return None;
                };
                let a = Expr::cast("uint32_t", self.expr(a));
                let b = Expr::cast("uint32_t", self.expr(b));
                Expr::cast("int32_t", Expr::bin(Op::Mul, a, b))
            }
            ("Math", "clz32") => {
                let value = Expr::cast("uint32_t", self.expr(first?));
                if self.options.standard.is_cpp20() {
                    Expr::call_path("std::countl_zero", vec![value])
                } else {
                    Expr::call(self.helper(Helper::Clz32), vec![value])
                }
            }
            (
                "Math",
                "abs" | "sqrt" | "cbrt" | "log" | "log2" | "log10" | "sin" | "cos" | "tan" | "exp"
                | "pow" | "atan2" | "hypot",
            ) => Expr::call_path(&format!("std::{method}"), self.arguments(arguments)),
            ("JSON", _) => self.unsupported(format!("JSON.{method}")),
            ("Object", "keys") => Expr::call(self.helper(Helper::Keys), vec![self.expr(first?)]),
            ("Object", "values") => Expr::call(self.helper(Helper::Values), vec![self.expr(first?)]),
            ("Object", "entries") => {
                Expr::call(self.helper(Helper::Entries), vec![self.expr(first?)])
            }
            ("Object", "freeze") => self.expr(first?),
            ("Object", "assign") => self.unsupported("Object.assign"),
            ("Array", "isArray") => {
                return Some(self.semantic(&Node::IsArray {
                    value: Box::new(first?.clone()),
                }));
            }
            ("Array", "from") => {
                return Some(self.semantic(&Node::ArrayFrom {
                    iterable: Box::new(first?.clone()),
                }));
            }
            ("Array", "of") => {
                let items = self.arguments(arguments);
                Expr::init("std::vector<std::any>", items)
            }
            ("String", "fromCharCode") => self.from_char_codes(arguments),
            ("Number", "isInteger") => self.is_integer_value(first?),
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
            "String" => self.stringify(first?),
            "Number" if self.is_stringy(first?) => Expr::call_path("std::stod", vec![self.expr(first?)]),
            "Number" => Expr::cast("double", self.expr(first?)),
            "Boolean" => Expr::cast("bool", self.condition(first?)),
            "isNaN" => Expr::call_path("std::isnan", vec![self.expr(first?)]),
            "isFinite" => Expr::call_path("std::isfinite", vec![self.expr(first?)]),
            "Array" if arguments.len() == 1 && int_literal(&arguments[0]).is_some() => {
                let size = self.expr(&arguments[0]);
                Expr::construct("std::vector<std::any>", vec![size])
            }
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::cpp::{CppOptions, Standard};
    use crate::traits::Transformer;
    use retarget_il::Program;
    use retarget_il::build::*;

    /// Lower `node` as the value of a local inside a function body.
    fn lower_expr_with(options: CppOptions, node: Node) -> (Expr, TranslationUnit) {
        let mut transformer = CppTransformer::new(options);
        let unit = transformer.transform(&Program::new(vec![function_decl(
            "f",
            &["x"],
            vec![const_decl("r", node)],
        )]));
        let value = unit
            .items
            .iter()
            .find_map(|item| match item {
                Item::Function(function) => function.body.iter().find_map(|stmt| match stmt {
                    Stmt::Local { value, .. } => value.clone(),
                    _ => None,
                }),
                _ => None,
            })
            .expect("lowered value");
        (value, unit)
    }

    fn lower_expr(node: Node) -> (Expr, TranslationUnit) {
        lower_expr_with(CppOptions::default(), node)
    }

    #[test]
    fn test_rotation_uses_bit_header() {
        let (value, _) = lower_expr(Node::RotateLeft {
            value: Box::new(ident("x")),
            amount: Box::new(int(39)),
            bits: 32,
        });
        assert_eq!(
            value,
            Expr::call_path("std::rotl", vec![Expr::cast("uint32_t", Expr::name("x")), Expr::int(7)])
        );
    }

    #[test]
    fn test_cpp17_rotation_is_spelled_out() {
        let options = CppOptions {
            standard: Standard::Cpp17,
            ..CppOptions::default()
        };
        let (value, _) = lower_expr_with(
            options,
            Node::RotateRight {
                value: Box::new(ident("x")),
                amount: Box::new(int(3)),
                bits: 8,
            },
        );
        assert!(matches!(value, Expr::Cast { ref ty, .. } if ty == "uint8_t"));
    }

    #[test]
    fn test_floor_of_integer_is_identity() {
        let (value, _) = lower_expr(Node::MathFloor {
            argument: Box::new(typed_ident("n", "int32")),
        });
        assert_eq!(value, Expr::name("n"));
    }

    #[test]
    fn test_pack_bytes_little_endian() {
        let (value, _) = lower_expr(Node::PackBytes {
            bytes: vec![ident("a"), ident("b")],
            bits: 16,
            endian: Endian::Little,
        });
        let expected = Expr::cast(
            "uint16_t",
            Expr::bin(
                Op::BitOr,
                Expr::cast("uint16_t", Expr::name("a")),
                Expr::bin(Op::Shl, Expr::cast("uint16_t", Expr::name("b")), Expr::int(8)),
            ),
        );
        assert_eq!(value, expected);
    }

    #[test]
    fn test_slice_pulls_in_clamp_helper() {
        let (value, unit) = lower_expr(Node::ArraySlice {
            array: Box::new(ident("x")),
            start: Some(Box::new(int(1))),
            end: None,
        });
        assert_eq!(
            value,
            Expr::call_path("rt::slice", vec![Expr::name("x"), Expr::int(1)])
        );
        assert_eq!(unit.helpers.len(), 2);
        assert!(unit.includes.iter().any(|header| header == "optional"));
    }

    #[test]
    fn test_named_callbacks_are_wrapped() {
        let (value, _) = lower_expr(Node::ArrayMap {
            array: Box::new(ident("x")),
            callback: Box::new(ident("double_it")),
        });
        let Expr::Call { args, .. } = value else {
            panic!("expected a call");
        };
        assert!(matches!(&args[1], Expr::Lambda { capture: "&", params, .. } if params.len() == 1));
    }

    #[test]
    fn test_text_to_bytes_uses_runtime() {
        let (value, unit) = lower_expr(Node::StringToBytes {
            string: Box::new(ident("x")),
            encoding: Some("base64".into()),
        });
        assert_eq!(value, Expr::call_path("rt::base64_decode", vec![Expr::name("x")]));
        assert_eq!(unit.helpers.len(), 1);
    }

    #[test]
    fn test_console_log_streams() {
        let (value, _) = lower_expr(Node::DebugOutput {
            arguments: vec![string("n ="), typed_ident("n", "int32")],
            level: DebugLevel::Log,
        });
        let expected = Expr::bin(
            Op::Shl,
            Expr::bin(
                Op::Shl,
                Expr::bin(
                    Op::Shl,
                    Expr::bin(Op::Shl, Expr::name("std::cout"), Expr::Str("n =".into())),
                    Expr::Char(' '),
                ),
                Expr::name("n"),
            ),
            Expr::Char('\n'),
        );
        assert_eq!(value, expected);
    }

    #[test]
    fn test_for_each_becomes_a_loop() {
        let mut transformer = CppTransformer::new(CppOptions::default());
        let unit = transformer.transform(&Program::new(vec![function_decl(
            "f",
            &["xs"],
            vec![expr_stmt(Node::ArrayForEach {
                array: Box::new(ident("xs")),
                callback: Box::new(arrow(&["v"], call(ident("g"), vec![ident("v")]))),
            })],
        )]));
        let Some(Item::Function(function)) = unit.items.first() else {
            panic!("expected a function");
        };
        assert!(matches!(
            function.body.as_slice(),
            [Stmt::ForEach { name, body, .. }] if name == "v" && body.len() == 1
        ));
    }

    fn callee(value: &Expr) -> &str {
        match value {
            Expr::Call { func, .. } => match func.as_ref() {
                Expr::Name(name) => name,
                other => panic!("expected a named callee, got {other:?}"),
            },
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn test_byte_values_print_as_numbers() {
        let (value, _) = lower_expr(Node::DebugOutput {
            arguments: vec![Node::RotateLeft {
                value: Box::new(int(129)),
                amount: Box::new(int(1)),
                bits: 8,
            }],
            level: DebugLevel::Log,
        });
        let rotated = Expr::call_path("std::rotl", vec![Expr::cast("uint8_t", Expr::int(129)), Expr::int(1)]);
        let expected = Expr::bin(
            Op::Shl,
            Expr::bin(Op::Shl, Expr::name("std::cout"), Expr::cast("int", rotated)),
            Expr::Char('\n'),
        );
        assert_eq!(value, expected);

        let (value, _) = lower_expr(Node::DebugOutput {
            arguments: vec![Node::Cast {
                expression: Box::new(int(200)),
                target_type: NumericType::Int8,
            }],
            level: DebugLevel::Log,
        });
        let Expr::Binary { left, .. } = value else {
            panic!("expected a stream");
        };
        let Expr::Binary { right, .. } = *left else {
            panic!("expected a streamed value");
        };
        assert_eq!(*right, Expr::cast("int", Expr::cast("int8_t", Expr::int(200))));
    }

    #[test]
    fn test_literal_length_counts_code_units() {
        let (value, _) = lower_expr(Node::StringLength {
            string: Box::new(string("h\u{e9}llo")),
        });
        assert_eq!(value, Expr::int(5));
        let (value, _) = lower_expr(member(string("abc"), "length"));
        assert_eq!(value, Expr::int(3));
    }

    #[test]
    fn test_string_family_uses_runtime_helpers() {
        let (value, _) = lower_expr(Node::StringSubstring {
            string: Box::new(ident("x")),
            start: Box::new(int(3)),
            end: Some(Box::new(int(1))),
        });
        assert_eq!(callee(&value), "rt::substring");

        let (value, _) = lower_expr(Node::StringPadStart {
            string: Box::new(ident("x")),
            length: Box::new(int(6)),
            fill: Some(Box::new(string("xy"))),
        });
        assert_eq!(callee(&value), "rt::pad_start");

        let (value, _) = lower_expr(Node::StringCharAt {
            string: Box::new(ident("x")),
            index: Box::new(int(0)),
        });
        assert_eq!(
            value,
            Expr::construct("std::string", vec![Expr::int(1), Expr::name("x").index(Expr::int(0))])
        );
    }

    #[test]
    fn test_zero_width_rotation_degrades_locally() {
        let (value, unit) = lower_expr(Node::RotateLeft {
            value: Box::new(ident("x")),
            amount: Box::new(int(1)),
            bits: 0,
        });
        assert_eq!(value, Expr::Placeholder("0-bit rotation".into()));
        assert!(unit.helpers.is_empty());
    }
}
