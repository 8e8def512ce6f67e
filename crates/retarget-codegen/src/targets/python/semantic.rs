//! Semantic operations and JS globals in Python spelling.

use super::ast::*;
use super::transform::{PythonTransformer, int_literal, is_size};
use crate::precedence::Op;
use retarget_il::{BinaryOperator, DebugLevel, Endian, Node, NumericType};

impl PythonTransformer {
    /// Semantic operations that read best as statements of their own.
    pub(super) fn semantic_statement(&mut self, node: &Node) -> Option<Vec<Stmt>> {
        let statements = match node {
            Node::ArrayReverse { array } => {
                vec![Stmt::Expr(Expr::method(self.expr(array), "reverse", Vec::new()))]
            }
            Node::ArraySort { array, compare } => {
                let array = self.expr(array);
                let (args, keywords) = self.sort_arguments(compare.as_deref());
                vec![Stmt::Expr(Expr::Call {
                    func: Box::new(array.attr("sort")),
                    args,
                    keywords,
                })]
            }
            Node::ArrayUnshift { array, values } if values.len() > 1 => {
                let array = self.expr(array);
                let values = self.arguments(values);
                vec![Stmt::assign(
                    array.slice(Some(Expr::int(0)), Some(Expr::int(0))),
                    Expr::List(values),
                )]
            }
            Node::ArraySplice {
                array,
                start,
                delete_count,
                items,
            } => {
                let array = self.expr(array);
                let start = self.expr(start);
                let end = delete_count
                    .as_deref()
                    .map(|count| self.splice_end(&start, count));
                let target = array.slice(Some(start), end);
                if items.is_empty() {
                    vec![Stmt::Delete(target)]
                } else {
                    let items = self.arguments(items);
                    vec![Stmt::assign(target, Expr::List(items))]
                }
            }
            Node::ArrayFill {
                array,
                value,
                start,
                end,
            } => {
                let (array, again) = self.reuse(array);
                let value = self.expr(value);
                let lower = start.as_deref().map(|start| self.expr(start));
                let upper = end.as_deref().map(|end| self.expr(end));
                let count = Expr::call_named(
                    "len",
                    vec![again.slice(lower.clone(), upper.clone())],
                );
                vec![Stmt::assign(
                    array.slice(lower, upper),
                    Expr::bin(Op::Mul, Expr::List(vec![value]), count),
                )]
            }
            Node::ArrayClear { array } => {
                vec![Stmt::Expr(Expr::method(self.expr(array), "clear", Vec::new()))]
            }
            Node::ArrayForEach { array, callback } => self.for_each_callback(array, callback)?,
            Node::MapSet { map, key, value } => {
                let map = self.expr(map);
                let key = self.expr(key);
                let value = self.expr(value);
                vec![Stmt::assign(map.index(key), value)]
            }
            Node::MapDelete { map, key } => {
                let map = self.expr(map);
                let key = self.expr(key);
                vec![Stmt::Expr(Expr::method(map, "pop", vec![key, Expr::None]))]
            }
            _ => return None,
        };
        Some(statements)
    }

    /// `forEach` with an inline callback, as a plain loop.
    fn for_each_callback(&mut self, array: &Node, callback: &Node) -> Option<Vec<Stmt>> {
        let function = callback.as_inline_function()?;
        if function.is_async || function.params.len() > 2 {
            return None;
        }
        let returns = function.body.any(&mut |n| matches!(n, Node::ReturnStatement { .. }));
        if returns && !function.expression {
            return None;
        }
        let names = function
            .params
            .iter()
            .map(|param| param.as_identifier().map(|name| self.ident(name)))
            .collect::<Option<Vec<_>>>()?;
        let mut iter = self.expr(array);
        let target = match names.as_slice() {
            [] => Expr::name("_"),
            [item] => Expr::name(item),
            [item, index] => {
                iter = Expr::call_named("enumerate", vec![iter]);
                Expr::Tuple(vec![Expr::name(index), Expr::name(item)])
            }
            _ => return None,
        };
        self.loops.push(Vec::new());
        let body = if function.expression {
            self.expression_statement(&function.body)
        } else {
            self.block(function.body_statements())
        };
        self.loops.pop();
        Some(vec![Stmt::For { target, iter, body }])
    }

    fn splice_end(&mut self, start: &Expr, count: &Node) -> Expr {
        let count = self.expr(count);
        match (start, &count) {
            (Expr::Int(s), _) if s == "0" => count,
            _ => Expr::bin(Op::Add, start.clone(), count),
        }
    }

    fn sort_arguments(&mut self, compare: Option<&Node>) -> (Vec<Expr>, Vec<(String, Expr)>) {
        let Some(compare) = compare else {
            return (Vec::new(), Vec::new());
        };
        if let Some(function) = compare.as_inline_function()
            && let Some((params, body)) = self.inline_callback(function, 2)
            && let [a, b] = params.as_slice()
            && let Node::BinaryExpression {
                operator: BinaryOperator::Sub,
                left,
                right,
            } = body
        {
            let (left, right) = (left.as_identifier(), right.as_identifier());
            let (left, right) = (left.map(|n| self.ident(n)), right.map(|n| self.ident(n)));
            if left.as_ref() == Some(a) && right.as_ref() == Some(b) {
                return (Vec::new(), Vec::new());
            }
            if left.as_ref() == Some(b) && right.as_ref() == Some(a) {
                return (Vec::new(), vec![("reverse".to_string(), Expr::Bool(true))]);
            }
        }
        self.import("functools");
        let compare = self.expr(compare);
        let key = Expr::call(Expr::name("functools").attr("cmp_to_key"), vec![compare]);
        (Vec::new(), vec![("key".to_string(), key)])
    }

    /// Lower `node` once and hand back two uses of the result.
    fn reuse(&mut self, node: &Node) -> (Expr, Expr) {
        let value = self.expr(node);
        self.twice(value)
    }

    /// `[element for target in iter if condition]` from an inline callback
    /// taking `(item)` or `(item, index)`.
    fn comprehension(
        &mut self,
        kind: CompKind,
        array: &Node,
        callback: &Node,
        yields_item: bool,
    ) -> Option<Expr> {
        let function = callback.as_inline_function()?;
        let (params, body) = self.inline_callback(function, 2)?;
        let mut iter = self.expr(array);
        let (target, item) = match params.as_slice() {
            [] => (Expr::name("_"), Expr::name("_")),
            [item] => (Expr::name(item), Expr::name(item)),
            [item, index] => {
                iter = Expr::call_named("enumerate", vec![iter]);
                (
                    Expr::Tuple(vec![Expr::name(index), Expr::name(item)]),
                    Expr::name(item),
                )
            }
            _ => return None,
        };
        let value = self.expr(body);
        let (element, condition) = if yields_item {
            (item, Some(Box::new(value)))
        } else {
            (value, None)
        };
        Some(Expr::Comprehension {
            kind,
            element: Box::new(element),
            target: Box::new(target),
            iter: Box::new(iter),
            condition,
        })
    }

    pub(super) fn semantic(&mut self, node: &Node) -> Expr {
        match node {
            // ------------------------------------------------------------ arrays
            Node::ArrayLength { array } => Expr::call_named("len", vec![self.expr(array)]),
            Node::ArrayPush { array, values } => {
                let array = self.expr(array);
                match values.as_slice() {
                    [single] if !matches!(single, Node::SpreadElement { .. }) => {
                        let value = self.expr(single);
                        Expr::method(array, "append", vec![value])
                    }
                    _ => {
                        let values = self.arguments(values);
                        Expr::method(array, "extend", vec![Expr::List(values)])
                    }
                }
            }
            Node::ArrayPop { array } => Expr::method(self.expr(array), "pop", Vec::new()),
            Node::ArrayShift { array } => {
                Expr::method(self.expr(array), "pop", vec![Expr::int(0)])
            }
            Node::ArrayUnshift { array, values } => {
                let array = self.expr(array);
                let values = self.arguments(values);
                match <[Expr; 1]>::try_from(values) {
                    Ok([value]) => Expr::method(array, "insert", vec![Expr::int(0), value]),
                    Err(values) => Expr::method(
                        array.slice(Some(Expr::int(0)), Some(Expr::int(0))),
                        "__iadd__",
                        vec![Expr::List(values)],
                    ),
                }
            }
            Node::ArraySlice { array, start, end } => {
                let array = self.expr(array);
                let lower = start.as_deref().map(|start| self.expr(start));
                let upper = end.as_deref().map(|end| self.expr(end));
                array.slice(lower, upper)
            }
            Node::ArraySplice {
                array,
                start,
                delete_count,
                items,
            } => {
                let (array, again) = self.reuse(array);
                let start = self.expr(start);
                let end = delete_count
                    .as_deref()
                    .map(|count| self.splice_end(&start, count));
                let items = self.arguments(items);
                let removed = array.slice(Some(start.clone()), end.clone());
                let range = Expr::call_named(
                    "slice",
                    vec![start, end.unwrap_or(Expr::None)],
                );
                let replace = Expr::method(again, "__setitem__", vec![range, Expr::List(items)]);
                Expr::List(vec![removed, replace]).index(Expr::int(0))
            }
            Node::ArrayConcat { array, others } => {
                let mut value = self.expr(array);
                for other in others {
                    let other = match other {
                        Node::ArrayExpression { .. } => self.expr(other),
                        _ => Expr::call_named("list", vec![self.expr(other)]),
                    };
                    value = Expr::bin(Op::Add, value, other);
                }
                value
            }
            Node::ArrayIndexOf { array, value } => {
                let (array, again) = self.reuse(array);
                let (value, value_again) = self.reuse(value);
                Expr::if_exp(
                    Expr::bin(Op::In, value, array),
                    Expr::method(again, "index", vec![value_again]),
                    Expr::int(-1),
                )
            }
            Node::ArrayIncludes { array, value } => {
                let value = self.expr(value);
                Expr::bin(Op::In, value, self.expr(array))
            }
            Node::ArrayJoin { array, separator } => {
                let separator = match separator {
                    Some(separator) => self.expr(separator),
                    None => Expr::str(","),
                };
                let items = Expr::call_named("map", vec![Expr::name("str"), self.expr(array)]);
                Expr::method(separator, "join", vec![items])
            }
            Node::ArrayReverse { array } => {
                let (array, again) = self.reuse(array);
                Expr::bin(Op::Or, Expr::method(array, "reverse", Vec::new()), again)
            }
            Node::ArraySort { array, compare } => {
                let (array, again) = self.reuse(array);
                let (args, keywords) = self.sort_arguments(compare.as_deref());
                let sort = Expr::Call {
                    func: Box::new(array.attr("sort")),
                    args,
                    keywords,
                };
                Expr::bin(Op::Or, sort, again)
            }
            Node::ArrayFill {
                array,
                value,
                start: None,
                end: None,
            } if is_fresh_array(array) => {
                let size = match array.as_ref() {
                    Node::ArrayCreation { size: Some(size), .. }
                    | Node::TypedArrayCreation { size: Some(size), .. } => self.expr(size),
                    Node::NewExpression { arguments, .. } => match arguments.first() {
                        Some(size) => self.expr(size),
                        None => Expr::int(0),
                    },
                    _ => Expr::int(0),
                };
                let value = self.expr(value);
                Expr::bin(Op::Mul, Expr::List(vec![value]), size)
            }
            Node::ArrayFill {
                array,
                value,
                start,
                end,
            } => {
                let (array, again) = self.reuse(array);
                let value = self.expr(value);
                let lower = start.as_deref().map(|start| self.expr(start));
                let upper = end.as_deref().map(|end| self.expr(end));
                let range = Expr::call_named(
                    "slice",
                    vec![lower.unwrap_or(Expr::None), upper.unwrap_or(Expr::None)],
                );
                let count = Expr::call_named(
                    "len",
                    vec![Expr::call_named(
                        "range",
                        vec![Expr::Starred(Box::new(Expr::method(
                            range.clone(),
                            "indices",
                            vec![Expr::call_named("len", vec![again.clone()])],
                        )))],
                    )],
                );
                let fill = Expr::method(
                    array,
                    "__setitem__",
                    vec![range, Expr::bin(Op::Mul, Expr::List(vec![value]), count)],
                );
                Expr::bin(Op::Or, fill, again)
            }
            Node::ArrayMap { array, callback } => {
                if let Some(comprehension) =
                    self.comprehension(CompKind::List, array, callback, false)
                {
                    return comprehension;
                }
                let func = self.expr(callback);
                let array = self.expr(array);
                Expr::call_named("list", vec![Expr::call_named("map", vec![func, array])])
            }
            Node::ArrayFilter { array, callback } => {
                if let Some(comprehension) =
                    self.comprehension(CompKind::List, array, callback, true)
                {
                    return comprehension;
                }
                let func = self.expr(callback);
                let array = self.expr(array);
                Expr::call_named("list", vec![Expr::call_named("filter", vec![func, array])])
            }
            Node::ArrayFind { array, callback } => {
                let generator = match self.comprehension(CompKind::Generator, array, callback, true) {
                    Some(generator) => generator,
                    None => {
                        let func = self.expr(callback);
                        let array = self.expr(array);
                        Expr::call_named("filter", vec![func, array])
                    }
                };
                Expr::call_named("next", vec![generator, Expr::None])
            }
            Node::ArrayEvery { array, callback } | Node::ArraySome { array, callback } => {
                let all = matches!(node, Node::ArrayEvery { .. });
                let reduce = if all { "all" } else { "any" };
                let generator = match self.comprehension(CompKind::Generator, array, callback, false) {
                    Some(generator) => generator,
                    None => {
                        let func = self.expr(callback);
                        let array = self.expr(array);
                        Expr::call_named("map", vec![func, array])
                    }
                };
                Expr::call_named(reduce, vec![generator])
            }
            Node::ArrayForEach { array, callback } => {
                // Only reached in expression position; statements become loops.
                let func = self.expr(callback);
                let array = self.expr(array);
                let calls = Expr::call_named("list", vec![Expr::call_named("map", vec![func, array])]);
                Expr::bin(Op::And, calls, Expr::None)
            }
            Node::ArrayReduce {
                array,
                callback,
                initial,
            } => {
                self.import("functools");
                let func = self.expr(callback);
                let mut args = vec![func, self.expr(array)];
                if let Some(initial) = initial {
                    args.push(self.expr(initial));
                }
                Expr::call(Expr::name("functools").attr("reduce"), args)
            }
            Node::ArrayCreation { size, element_type } => {
                let filler = match element_type.as_deref().and_then(NumericType::parse) {
                    Some(ty) if ty.is_float() => Expr::Float("0.0".into()),
                    Some(_) => Expr::int(0),
                    None => Expr::None,
                };
                match size {
                    Some(size) => {
                        let size = self.expr(size);
                        Expr::bin(Op::Mul, Expr::List(vec![filler]), size)
                    }
                    None => Expr::List(Vec::new()),
                }
            }
            Node::TypedArrayCreation {
                element_type,
                size,
                source,
            } => {
                let size = size.as_deref().map(|size| self.expr(size));
                let source = source.as_deref().map(|source| self.expr(source));
                self.typed_array(*element_type, size, source)
            }
            Node::ArrayFrom { iterable } => Expr::call_named("list", vec![self.expr(iterable)]),
            Node::ArrayUnique { array } => Expr::call_named(
                "list",
                vec![Expr::method(
                    Expr::name("dict"),
                    "fromkeys",
                    vec![self.expr(array)],
                )],
            ),
            Node::ArrayXor { left, right } => {
                let left = self.expr(left);
                let right = self.expr(right);
                Expr::call_named(
                    "bytearray",
                    vec![Expr::Comprehension {
                        kind: CompKind::Generator,
                        element: Box::new(Expr::bin(Op::BitXor, Expr::name("_a"), Expr::name("_b"))),
                        target: Box::new(Expr::Tuple(vec![Expr::name("_a"), Expr::name("_b")])),
                        iter: Box::new(Expr::call_named("zip", vec![left, right])),
                        condition: None,
                    }],
                )
            }
            Node::CopyArray { array } => self.expr(array).slice(None, None),

            // ----------------------------------------------------------- strings
            Node::StringLength { string } => Expr::call_named("len", vec![self.expr(string)]),
            Node::StringSplit { string, separator } => {
                let string = self.expr(string);
                match separator.as_deref() {
                    None => Expr::List(vec![string]),
                    Some(separator) if separator.as_string_literal() == Some("") => {
                        Expr::call_named("list", vec![string])
                    }
                    Some(separator) => {
                        let separator = self.expr(separator);
                        Expr::method(string, "split", vec![separator])
                    }
                }
            }
            Node::StringSubstring { string, start, end } => {
                let string = self.expr(string);
                self.substring(string, start, end.as_deref())
            }
            Node::StringIndexOf { string, search } => {
                let search = self.expr(search);
                Expr::method(self.expr(string), "find", vec![search])
            }
            Node::StringReplace {
                string,
                search,
                replacement,
                all,
            } => {
                let string = self.expr(string);
                let mut args = vec![self.expr(search), self.expr(replacement)];
                if !all {
                    args.push(Expr::int(1));
                }
                Expr::method(string, "replace", args)
            }
            Node::StringToUpper { string } => Expr::method(self.expr(string), "upper", Vec::new()),
            Node::StringToLower { string } => Expr::method(self.expr(string), "lower", Vec::new()),
            Node::StringTrim { string } => Expr::method(self.expr(string), "strip", Vec::new()),
            Node::StringStartsWith { string, search } => {
                let string = self.expr(string);
                Expr::method(string, "startswith", vec![self.expr(search)])
            }
            Node::StringEndsWith { string, search } => {
                let string = self.expr(string);
                Expr::method(string, "endswith", vec![self.expr(search)])
            }
            Node::StringIncludes { string, search } => {
                let search = self.expr(search);
                Expr::bin(Op::In, search, self.expr(string))
            }
            Node::StringRepeat { string, count } => {
                let string = self.expr(string);
                Expr::bin(Op::Mul, string, self.expr(count))
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
                let at_start = matches!(node, Node::StringPadStart { .. });
                self.pad(string, length, fill.as_deref(), at_start)
            }
            Node::StringCharAt { string, index } => {
                let string = self.expr(string);
                let (index, again) = self.reuse(index);
                let next = Expr::bin(Op::Add, again, Expr::int(1));
                string.slice(Some(index), Some(next))
            }
            Node::StringCharCodeAt { string, index } => {
                let string = self.expr(string);
                Expr::call_named("ord", vec![string.index(self.expr(index))])
            }
            Node::StringFromCharCodes { codes } => match codes.as_slice() {
                [Node::SpreadElement { argument }] => {
                    let codes = self.expr(argument);
                    Expr::method(
                        Expr::str(""),
                        "join",
                        vec![Expr::call_named("map", vec![Expr::name("chr"), codes])],
                    )
                }
                [single] => Expr::call_named("chr", vec![self.expr(single)]),
                _ => {
                    let codes = self.arguments(codes);
                    Expr::method(
                        Expr::str(""),
                        "join",
                        vec![Expr::call_named(
                            "map",
                            vec![Expr::name("chr"), Expr::List(codes)],
                        )],
                    )
                }
            },
            Node::StringConcat { parts } => {
                let mut parts = parts.iter();
                let Some(first) = parts.next() else {
                    return Expr::str("");
                };
                let mut value = self.as_text(first);
                for part in parts {
                    let part = self.as_text(part);
                    value = Expr::bin(Op::Add, value, part);
                }
                value
            }
            Node::StringToBytes { string, encoding } => {
                let string = self.expr(string);
                match encoding.as_deref() {
                    Some("hex") => Expr::method(Expr::name("bytearray"), "fromhex", vec![string]),
                    Some("base64") => {
                        self.import("base64");
                        Expr::call_named(
                            "bytearray",
                            vec![Expr::call(Expr::name("base64").attr("b64decode"), vec![string])],
                        )
                    }
                    other => Expr::call_named(
                        "bytearray",
                        vec![string, Expr::str(python_encoding(other))],
                    ),
                }
            }
            Node::BytesToString { bytes, encoding } => {
                let bytes = Expr::call_named("bytes", vec![self.expr(bytes)]);
                match encoding.as_deref() {
                    Some("hex") => Expr::method(bytes, "hex", Vec::new()),
                    Some("base64") => {
                        self.import("base64");
                        Expr::method(
                            Expr::call(Expr::name("base64").attr("b64encode"), vec![bytes]),
                            "decode",
                            vec![Expr::str("ascii")],
                        )
                    }
                    other => Expr::method(bytes, "decode", vec![Expr::str(python_encoding(other))]),
                }
            }

            // -------------------------------------------------------------- math
            Node::MathFloor { argument } => self.math("floor", argument),
            Node::MathCeil { argument } => self.math("ceil", argument),
            Node::MathSqrt { argument } => self.math("sqrt", argument),
            Node::MathTrunc { argument } => self.math("trunc", argument),
            Node::MathLog { argument } => self.math("log", argument),
            Node::MathRound { argument } => {
                self.import("math");
                let value = Expr::bin(Op::Add, self.expr(argument), Expr::Float("0.5".into()));
                Expr::call(Expr::name("math").attr("floor"), vec![value])
            }
            Node::MathAbs { argument } => Expr::call_named("abs", vec![self.expr(argument)]),
            Node::MathMin { arguments } => Expr::call_named("min", self.arguments(arguments)),
            Node::MathMax { arguments } => Expr::call_named("max", self.arguments(arguments)),
            Node::MathPow { base, exponent } => {
                let base = self.expr(base);
                Expr::bin(Op::Pow, base, self.expr(exponent))
            }
            Node::MathRandom {} => {
                self.import("random");
                Expr::call(Expr::name("random").attr("random"), Vec::new())
            }
            Node::MathSign { argument } => {
                let (value, again) = self.reuse(argument);
                Expr::bin(
                    Op::Sub,
                    Expr::bin(Op::Gt, value, Expr::int(0)),
                    Expr::bin(Op::Lt, again, Expr::int(0)),
                )
            }

            // ---------------------------------------------------- bits / numbers
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
            Node::PackBytes { bytes, bits, endian } => {
                let count = (*bits / 8) as usize;
                let mut value: Option<Expr> = None;
                for (i, byte) in bytes.iter().take(count).enumerate() {
                    let shift = match endian {
                        Endian::Big => (count - 1 - i) * 8,
                        Endian::Little => i * 8,
                    };
                    let byte = Expr::bin(Op::BitAnd, self.expr(byte), Expr::hex(0xFF));
                    let part = if shift == 0 {
                        byte
                    } else {
                        Expr::bin(Op::Shl, byte, Expr::int(shift as i64))
                    };
                    value = Some(match value {
                        Some(value) => Expr::bin(Op::BitOr, value, part),
                        None => part,
                    });
                }
                value.unwrap_or_else(|| Expr::int(0))
            }
            Node::UnpackBytes { value, bits, endian } => {
                let bytes = bits / 8;
                let mask = mask_of(*bits);
                let value = Expr::bin(Op::BitAnd, self.expr(value), Expr::hex(mask));
                let order = match endian {
                    Endian::Big => "big",
                    Endian::Little => "little",
                };
                Expr::call_named(
                    "list",
                    vec![Expr::method(
                        value,
                        "to_bytes",
                        vec![Expr::int(i64::from(bytes)), Expr::str(order)],
                    )],
                )
            }
            Node::ParseInteger { string, radix } => {
                let mut args = vec![self.expr(string)];
                if let Some(radix) = radix {
                    args.push(self.expr(radix));
                }
                Expr::call_named("int", args)
            }
            Node::ParseFloat { string } => Expr::call_named("float", vec![self.expr(string)]),
            Node::NumberToString { value, radix } => {
                let value = self.expr(value);
                let spec = match radix.as_deref().and_then(int_literal) {
                    Some(16) => Some("x"),
                    Some(2) => Some("b"),
                    Some(8) => Some("o"),
                    _ => None,
                };
                match (spec, radix) {
                    (Some(spec), _) => Expr::call_named("format", vec![value, Expr::str(spec)]),
                    (None, Some(_)) => self.unsupported("toString with a non-literal radix"),
                    (None, None) => Expr::call_named("str", vec![value]),
                }
            }
            Node::IsInteger { value } => {
                Expr::call_named("isinstance", vec![self.expr(value), Expr::name("int")])
            }

            // --------------------------------------------------------- encodings
            Node::HexEncode { bytes } => {
                Expr::method(Expr::call_named("bytes", vec![self.expr(bytes)]), "hex", Vec::new())
            }
            Node::HexDecode { string } => {
                Expr::method(Expr::name("bytearray"), "fromhex", vec![self.expr(string)])
            }
            Node::Base64Encode { bytes } => {
                self.import("base64");
                let bytes = Expr::call_named("bytes", vec![self.expr(bytes)]);
                Expr::method(
                    Expr::call(Expr::name("base64").attr("b64encode"), vec![bytes]),
                    "decode",
                    vec![Expr::str("ascii")],
                )
            }
            Node::Base64Decode { string } => {
                self.import("base64");
                Expr::call_named(
                    "bytearray",
                    vec![Expr::call(
                        Expr::name("base64").attr("b64decode"),
                        vec![self.expr(string)],
                    )],
                )
            }

            // -------------------------------------------------------------- maps
            Node::MapCreation { entries } => self.dict(entries),
            Node::MapGet { map, key } => {
                let map = self.expr(map);
                Expr::method(map, "get", vec![self.expr(key)])
            }
            Node::MapSet { map, key, value } => {
                let map = self.expr(map);
                let key = self.expr(key);
                let value = self.expr(value);
                let (map, again) = self.twice(map);
                Expr::bin(
                    Op::Or,
                    Expr::method(map, "__setitem__", vec![key, value]),
                    again,
                )
            }
            Node::MapHas { map, key } => {
                let key = self.expr(key);
                Expr::bin(Op::In, key, self.expr(map))
            }
            Node::MapDelete { map, key } => {
                let (map, again) = self.reuse(map);
                let (key, key_again) = self.reuse(key);
                let present = Expr::bin(Op::In, key, map);
                Expr::bin(
                    Op::And,
                    present,
                    Expr::bin(
                        Op::Or,
                        Expr::method(again, "pop", vec![key_again]),
                        Expr::Bool(true),
                    ),
                )
            }
            Node::MapKeys { map } => self.map_view(map, "keys"),
            Node::MapValues { map } => self.map_view(map, "values"),
            Node::MapEntries { map } => self.map_view(map, "items"),
            Node::MapSize { map } => Expr::call_named("len", vec![self.expr(map)]),
            Node::ObjectFreeze { object } => self.expr(object),
            Node::IsArray { value } => Expr::call_named(
                "isinstance",
                vec![
                    self.expr(value),
                    Expr::Tuple(vec![Expr::name("list"), Expr::name("bytearray")]),
                ],
            ),

            // -------------------------------------------------------------- misc
            Node::DebugOutput { arguments, level } => {
                let args = self.arguments(arguments);
                match level {
                    DebugLevel::Log | DebugLevel::Info => Expr::call_named("print", args),
                    DebugLevel::Warn | DebugLevel::Error => {
                        self.import("sys");
                        Expr::Call {
                            func: Box::new(Expr::name("print")),
                            args,
                            keywords: vec![("file".to_string(), Expr::name("sys").attr("stderr"))],
                        }
                    }
                }
            }
            Node::ErrorCreation {
                error_type,
                message,
            } => {
                let class = error_type
                    .as_deref()
                    .and_then(super::transform::builtin_exception)
                    .unwrap_or("Exception");
                let args = match message {
                    Some(message) => vec![self.expr(message)],
                    None => Vec::new(),
                };
                Expr::call_named(class, args)
            }
            other => self.unsupported(other.kind()),
        }
    }

    fn math(&mut self, function: &str, argument: &Node) -> Expr {
        self.import("math");
        let argument = self.expr(argument);
        Expr::call(Expr::name("math").attr(function), vec![argument])
    }

    fn map_view(&mut self, map: &Node, view: &str) -> Expr {
        let map = self.expr(map);
        Expr::call_named("list", vec![Expr::method(map, view, Vec::new())])
    }

    /// `substring` clamps negative bounds to zero and swaps reversed ones.
    fn substring(&mut self, string: Expr, start: &Node, end: Option<&Node>) -> Expr {
        let Some(end) = end else {
            let lower = match int_literal(start) {
                Some(n) => Expr::int(n.max(0)),
                None => Expr::call_named("max", vec![self.expr(start), Expr::int(0)]),
            };
            return string.slice(Some(lower), None);
        };
        match (int_literal(start), int_literal(end)) {
            (Some(a), Some(b)) => string.slice(
                Some(Expr::int(a.min(b).max(0))),
                Some(Expr::int(a.max(b).max(0))),
            ),
            (Some(0), None) => {
                let upper = Expr::call_named("max", vec![self.expr(end), Expr::int(0)]);
                string.slice(None, Some(upper))
            }
            _ => {
                let (start, start_again) = self.reuse(start);
                let (end, end_again) = self.reuse(end);
                let lower = Expr::call_named(
                    "max",
                    vec![Expr::call_named("min", vec![start, end]), Expr::int(0)],
                );
                let upper = Expr::call_named("max", vec![start_again, end_again, Expr::int(0)]);
                string.slice(Some(lower), Some(upper))
            }
        }
    }

    /// `rjust`/`ljust` take one fill character; longer fills are repeated
    /// and cut to the missing width.
    fn pad(&mut self, string: &Node, length: &Node, fill: Option<&Node>, at_start: bool) -> Expr {
        let text = self.as_text(string);
        let fill = match fill {
            Some(fill) if fill.as_string_literal().is_none_or(|s| s.chars().count() != 1) => fill,
            single => {
                let method = if at_start { "rjust" } else { "ljust" };
                let mut args = vec![self.expr(length)];
                if let Some(fill) = single {
                    args.push(self.expr(fill));
                }
                return Expr::method(text, method, args);
            }
        };
        let (text, text_again) = self.twice(text);
        let (length, length_again) = self.reuse(length);
        let repeated = Expr::bin(Op::Mul, self.expr(fill), length);
        let missing = |text: Expr| {
            Expr::call_named(
                "max",
                vec![
                    Expr::bin(Op::Sub, length_again, Expr::call_named("len", vec![text])),
                    Expr::int(0),
                ],
            )
        };
        if at_start {
            let padding = repeated.slice(None, Some(missing(text)));
            Expr::bin(Op::Add, padding, text_again)
        } else {
            let padding = repeated.slice(None, Some(missing(text_again)));
            Expr::bin(Op::Add, text, padding)
        }
    }

    fn rotate(&mut self, value: &Node, amount: &Node, bits: u32, left: bool) -> Expr {
        if !(1..=64).contains(&bits) {
            return self.unsupported(format!("{bits}-bit rotation"));
        }
        let mask = Expr::hex(mask_of(bits));
        let value = self.expr(value);
        let (value, again) = self.twice(Expr::bin(Op::BitAnd, value, mask.clone()));
        let amount = match int_literal(amount) {
            Some(n) => Expr::int(n.rem_euclid(i64::from(bits))),
            None => Expr::bin(Op::Mod, self.expr(amount), Expr::int(i64::from(bits))),
        };
        let (amount, amount_again) = self.twice(amount);
        let rest = Expr::bin(Op::Sub, Expr::int(i64::from(bits)), amount_again);
        let (first, second) = if left {
            (Op::Shl, Op::Shr)
        } else {
            (Op::Shr, Op::Shl)
        };
        Expr::bin(
            Op::BitAnd,
            Expr::bin(
                Op::BitOr,
                Expr::bin(first, value, amount),
                Expr::bin(second, again, rest),
            ),
            mask,
        )
    }

    fn cast(&mut self, expression: &Node, target: NumericType) -> Expr {
        let mut value = self.expr(expression);
        if target.is_float() {
            return Expr::call_named("float", vec![value]);
        }
        let from_float = crate::infer::expression_type(expression)
            .and_then(|ty| ty.primitive())
            .is_some_and(|primitive| primitive.is_numeric() && !primitive.is_integer());
        if from_float {
            value = Expr::call_named("int", vec![value]);
        }
        let Some(mask) = target.mask() else {
            return value;
        };
        let masked = Expr::bin(Op::BitAnd, value, Expr::hex(mask));
        if !target.is_signed() {
            return masked;
        }
        let sign = Expr::hex(1u64 << (target.bits() - 1));
        Expr::bin(Op::Sub, Expr::bin(Op::BitXor, masked, sign.clone()), sign)
    }

    pub(super) fn typed_array(
        &mut self,
        element: NumericType,
        size: Option<Expr>,
        source: Option<Expr>,
    ) -> Expr {
        let bytes = element == NumericType::Uint8;
        match (size, source) {
            (_, Some(source)) if bytes => Expr::call_named("bytearray", vec![source]),
            (_, Some(source)) => Expr::call_named("list", vec![source]),
            (Some(size), None) if bytes => Expr::call_named("bytearray", vec![size]),
            (Some(size), None) => {
                let zero = if element.is_float() {
                    Expr::Float("0.0".into())
                } else {
                    Expr::int(0)
                };
                Expr::bin(Op::Mul, Expr::List(vec![zero]), size)
            }
            (None, None) if bytes => Expr::call_named("bytearray", Vec::new()),
            (None, None) => Expr::List(Vec::new()),
        }
    }

    /// `Math.PI`, `Number.MAX_SAFE_INTEGER` and friends.
    pub(super) fn global_constant(&mut self, object: &Node, name: &str) -> Option<Expr> {
        let owner = object.as_identifier().filter(|owner| !self.is_local(owner))?;
        Some(match (owner, name) {
            ("Math", "PI") => self.math_constant("pi"),
            ("Math", "E") => self.math_constant("e"),
            ("Math", "LN2") => {
                self.import("math");
                Expr::call(Expr::name("math").attr("log"), vec![Expr::int(2)])
            }
            ("Number", "MAX_SAFE_INTEGER") => Expr::Int("9007199254740991".into()),
            ("Number", "MIN_SAFE_INTEGER") => Expr::Int("-9007199254740991".into()),
            ("Number", "EPSILON") => {
                self.import("sys");
                Expr::name("sys").attr("float_info").attr("epsilon")
            }
            ("Number", "POSITIVE_INFINITY") => self.math_constant("inf"),
            ("Number", "NEGATIVE_INFINITY") => Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(self.math_constant("inf")),
            },
            ("Number", "NaN") => self.math_constant("nan"),
            _ => return None,
        })
    }

    /// Calls on JS globals: `console.log`, `Math.floor`, `JSON.stringify`...
    pub(super) fn global_call(&mut self, owner: &str, method: &str, arguments: &[Node]) -> Option<Expr> {
        if self.is_local(owner) {
            return None;
        }
        let first = arguments.first();
        Some(match (owner, method) {
            ("console", "log" | "info" | "debug") => Expr::call_named("print", self.arguments(arguments)),
            ("console", "warn" | "error") => {
                self.import("sys");
                Expr::Call {
                    func: Box::new(Expr::name("print")),
                    args: self.arguments(arguments),
                    keywords: vec![("file".to_string(), Expr::name("sys").attr("stderr"))],
                }
            }
            ("Math", "floor" | "ceil" | "sqrt" | "trunc" | "log" | "log2" | "log10" | "sin" | "cos" | "exp") => {
                self.import("math");
                Expr::call(Expr::name("math").attr(method), self.arguments(arguments))
            }
            ("Math", "abs") => Expr::call_named("abs", self.arguments(arguments)),
            ("Math", "min") => Expr::call_named("min", self.arguments(arguments)),
            ("Math", "max") => Expr::call_named("max", self.arguments(arguments)),
            ("Math", "pow") => {
                let [base, exponent] = arguments else {
                    return None;
                };
                let base = self.expr(base);
                Expr::bin(Op::Pow, base, self.expr(exponent))
            }
            ("Math", "round") => {
                self.import("math");
                let value = Expr::bin(Op::Add, self.expr(first?), Expr::Float("0.5".into()));
                Expr::call(Expr::name("math").attr("floor"), vec![value])
            }
            ("Math", "random") => {
                self.import("random");
                Expr::call(Expr::name("random").attr("random"), Vec::new())
            }
            ("Math", "imul") => {
                let [a, b] = arguments else {
                    return None;
                };
                let product = Expr::bin(Op::Mul, self.expr(a), self.expr(b));
                let masked = Expr::bin(Op::BitAnd, product, Expr::hex(0xFFFF_FFFF));
                let sign = Expr::hex(0x8000_0000);
                Expr::bin(Op::Sub, Expr::bin(Op::BitXor, masked, sign.clone()), sign)
            }
            ("JSON", "stringify") => {
                self.import("json");
                Expr::call(Expr::name("json").attr("dumps"), self.arguments(arguments))
            }
            ("JSON", "parse") => {
                self.import("json");
                Expr::call(Expr::name("json").attr("loads"), self.arguments(arguments))
            }
            ("Object", "keys") => self.map_view(first?, "keys"),
            ("Object", "values") => self.map_view(first?, "values"),
            ("Object", "entries") => self.map_view(first?, "items"),
            ("Object", "freeze") => self.expr(first?),
            ("Object", "assign") => {
                let (target, sources) = arguments.split_first()?;
                let (target, again) = self.reuse(target);
                let mut items = vec![DictItem::Spread(target)];
                for source in sources {
                    items.push(DictItem::Spread(self.expr(source)));
                }
                let merged = Expr::Dict(items);
                Expr::bin(Op::Or, Expr::method(again.clone(), "update", vec![merged]), again)
            }
            ("Array", "isArray") => Expr::call_named(
                "isinstance",
                vec![self.expr(first?), Expr::Tuple(vec![Expr::name("list"), Expr::name("bytearray")])],
            ),
            ("Array", "from") => Expr::call_named("list", vec![self.expr(first?)]),
            ("Array", "of") => Expr::List(self.arguments(arguments)),
            ("String", "fromCharCode") => {
                return Some(self.semantic(&Node::StringFromCharCodes {
                    codes: arguments.to_vec(),
                }));
            }
            ("Number", "isInteger") => {
                Expr::call_named("isinstance", vec![self.expr(first?), Expr::name("int")])
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
            "parseInt" => {
                let mut args = vec![self.expr(first?)];
                if let Some(radix) = arguments.get(1) {
                    args.push(self.expr(radix));
                }
                Expr::call_named("int", args)
            }
            "parseFloat" => Expr::call_named("float", vec![self.expr(first?)]),
            "String" => Expr::call_named("str", self.arguments(arguments)),
            "Number" => Expr::call_named("float", self.arguments(arguments)),
            "Boolean" => Expr::call_named("bool", self.arguments(arguments)),
            "isNaN" => {
                self.import("math");
                Expr::call(Expr::name("math").attr("isnan"), self.arguments(arguments))
            }
            "isFinite" => {
                self.import("math");
                Expr::call(Expr::name("math").attr("isfinite"), self.arguments(arguments))
            }
            "Array" if arguments.len() == 1 && is_size(&arguments[0]) => {
                let size = self.expr(&arguments[0]);
                Expr::bin(Op::Mul, Expr::List(vec![Expr::None]), size)
            }
            _ => return None,
        })
    }
}

fn is_fresh_array(node: &Node) -> bool {
    match node {
        Node::ArrayCreation { size: Some(_), .. } | Node::TypedArrayCreation { size: Some(_), .. } => true,
        Node::NewExpression { callee, arguments } => {
            callee.as_identifier() == Some("Array") && arguments.len() == 1 && is_size(&arguments[0])
        }
        _ => false,
    }
}

fn mask_of(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

fn python_encoding(encoding: Option<&str>) -> &'static str {
    match encoding.map(str::to_ascii_lowercase).as_deref() {
        Some("ascii") => "ascii",
        Some("latin1" | "latin-1" | "binary" | "iso-8859-1") => "latin-1",
        Some("utf16" | "utf-16" | "utf16le" | "utf-16le") => "utf-16-le",
        _ => "utf-8",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::python::PythonOptions;
    use crate::traits::Transformer;
    use retarget_il::Program;
    use retarget_il::build::*;

    fn lower_expr(node: Node) -> (Expr, Vec<Import>) {
        let mut transformer = PythonTransformer::new(PythonOptions::default());
        let module = transformer.transform(&Program::new(vec![expr_stmt(call(
            ident("use"),
            vec![node],
        ))]));
        match module.body.into_iter().next() {
            Some(Stmt::Expr(Expr::Call { mut args, .. })) => (args.remove(0), module.imports),
            other => panic!("unexpected lowering: {other:?}"),
        }
    }

    #[test]
    fn test_rotation_masks_to_width() {
        let (expr, _) = lower_expr(Node::RotateLeft {
            value: Box::new(ident("x")),
            amount: Box::new(int(7)),
            bits: 32,
        });
        let Expr::BinOp { op: Op::BitAnd, right, .. } = &expr else {
            panic!("expected a masked rotation, got {expr:?}");
        };
        assert_eq!(**right, Expr::hex(0xFFFF_FFFF));
    }

    #[test]
    fn test_signed_cast_uses_sign_trick() {
        let (expr, _) = lower_expr(Node::Cast {
            expression: Box::new(ident("x")),
            target_type: NumericType::Int8,
        });
        let Expr::BinOp { op: Op::Sub, right, .. } = &expr else {
            panic!("expected sign extension, got {expr:?}");
        };
        assert_eq!(**right, Expr::hex(0x80));
    }

    #[test]
    fn test_filter_becomes_comprehension() {
        let (expr, _) = lower_expr(Node::ArrayFilter {
            array: Box::new(ident("xs")),
            callback: Box::new(arrow(
                &["x"],
                binary(BinaryOperator::Gt, ident("x"), int(0)),
            )),
        });
        assert!(
            matches!(&expr, Expr::Comprehension { kind: CompKind::List, condition: Some(_), .. }),
            "{expr:?}"
        );
    }

    #[test]
    fn test_numeric_sort_needs_no_key() {
        let mut transformer = PythonTransformer::new(PythonOptions::default());
        let module = transformer.transform(&Program::new(vec![expr_stmt(Node::ArraySort {
            array: Box::new(ident("xs")),
            compare: Some(Box::new(arrow(
                &["a", "b"],
                binary(BinaryOperator::Sub, ident("b"), ident("a")),
            ))),
        })]));
        let Stmt::Expr(Expr::Call { keywords, .. }) = &module.body[0] else {
            panic!("expected a sort call");
        };
        assert_eq!(keywords, &[("reverse".to_string(), Expr::Bool(true))]);
        assert!(module.imports.is_empty());
    }

    #[test]
    fn test_math_imports_math() {
        let (_, imports) = lower_expr(Node::MathFloor {
            argument: Box::new(ident("x")),
        });
        assert_eq!(imports[0].module, "math");
    }

    #[test]
    fn test_substring_clamps_and_swaps_bounds() {
        let (swapped, _) = lower_expr(Node::StringSubstring {
            string: Box::new(ident("s")),
            start: Box::new(int(3)),
            end: Some(Box::new(int(1))),
        });
        assert_eq!(swapped, Expr::name("s").slice(Some(Expr::int(1)), Some(Expr::int(3))));

        let (negative, _) = lower_expr(Node::StringSubstring {
            string: Box::new(ident("s")),
            start: Box::new(int(-2)),
            end: None,
        });
        assert_eq!(negative, Expr::name("s").slice(Some(Expr::int(0)), None));

        let (dynamic, _) = lower_expr(Node::StringSubstring {
            string: Box::new(ident("s")),
            start: Box::new(ident("a")),
            end: Some(Box::new(ident("b"))),
        });
        let lower = Expr::call_named(
            "max",
            vec![Expr::call_named("min", vec![Expr::name("a"), Expr::name("b")]), Expr::int(0)],
        );
        let upper = Expr::call_named("max", vec![Expr::name("a"), Expr::name("b"), Expr::int(0)]);
        assert_eq!(dynamic, Expr::name("s").slice(Some(lower), Some(upper)));
    }

    #[test]
    fn test_pad_with_long_fill_repeats_it() {
        let (expr, _) = lower_expr(Node::StringPadStart {
            string: Box::new(string("abc")),
            length: Box::new(int(6)),
            fill: Some(Box::new(string("xy"))),
        });
        let missing = Expr::call_named(
            "max",
            vec![
                Expr::bin(Op::Sub, Expr::int(6), Expr::call_named("len", vec![Expr::str("abc")])),
                Expr::int(0),
            ],
        );
        let padding = Expr::bin(Op::Mul, Expr::str("xy"), Expr::int(6)).slice(None, Some(missing));
        assert_eq!(expr, Expr::bin(Op::Add, padding, Expr::str("abc")));
    }

    #[test]
    fn test_pad_with_one_char_uses_ljust() {
        let (expr, _) = lower_expr(Node::StringPadEnd {
            string: Box::new(string("7")),
            length: Box::new(int(3)),
            fill: Some(Box::new(string("0"))),
        });
        assert_eq!(
            expr,
            Expr::method(Expr::str("7"), "ljust", vec![Expr::int(3), Expr::str("0")])
        );
    }

    #[test]
    fn test_char_at_slices_one_char() {
        let (expr, _) = lower_expr(Node::StringCharAt {
            string: Box::new(ident("s")),
            index: Box::new(ident("i")),
        });
        let next = Expr::bin(Op::Add, Expr::name("i"), Expr::int(1));
        assert_eq!(expr, Expr::name("s").slice(Some(Expr::name("i")), Some(next)));

        let (code, _) = lower_expr(Node::StringCharCodeAt {
            string: Box::new(ident("s")),
            index: Box::new(int(0)),
        });
        assert_eq!(code, Expr::call_named("ord", vec![Expr::name("s").index(Expr::int(0))]));
    }

    #[test]
    fn test_zero_width_rotation_degrades_locally() {
        let (expr, _) = lower_expr(Node::RotateRight {
            value: Box::new(ident("x")),
            amount: Box::new(int(1)),
            bits: 0,
        });
        assert_eq!(expr, Expr::Placeholder("0-bit rotation".into()));
    }
}
