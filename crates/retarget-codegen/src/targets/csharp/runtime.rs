//! Support methods for operations the BCL has no single call for. Each is
//! added to the program class the first time generated code uses it, and is
//! `internal` so the other classes in the file can reach it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Helper {
    Pop,
    Shift,
    Slice,
    Splice,
    Fill,
    XorBytes,
    ReplaceFirst,
    Substring,
    PadStart,
    PadEnd,
    CharAt,
}

impl Helper {
    pub fn name(self) -> &'static str {
        match self {
            Helper::Pop => "Pop",
            Helper::Shift => "Shift",
            Helper::Slice => "Slice",
            Helper::Splice => "Splice",
            Helper::Fill => "Fill",
            Helper::XorBytes => "XorBytes",
            Helper::ReplaceFirst => "ReplaceFirst",
            Helper::Substring => "Substring",
            Helper::PadStart => "PadStart",
            Helper::PadEnd => "PadEnd",
            Helper::CharAt => "CharAt",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Helper::Pop => POP,
            Helper::Shift => SHIFT,
            Helper::Slice => SLICE,
            Helper::Splice => SPLICE,
            Helper::Fill => FILL,
            Helper::XorBytes => XOR_BYTES,
            Helper::ReplaceFirst => REPLACE_FIRST,
            Helper::Substring => SUBSTRING,
            Helper::PadStart => PAD_START,
            Helper::PadEnd => PAD_END,
            Helper::CharAt => CHAR_AT,
        }
    }
}

const POP: &str = "\
internal static T Pop<T>(List<T> list)
{
    var last = list[list.Count - 1];
    list.RemoveAt(list.Count - 1);
    return last;
}";

const SHIFT: &str = "\
internal static T Shift<T>(List<T> list)
{
    var first = list[0];
    list.RemoveAt(0);
    return first;
}";

const SLICE: &str = "\
internal static List<T> Slice<T>(IEnumerable<T> source, int start = 0, int? end = null)
{
    var items = source.ToList();
    int from = start < 0 ? Math.Max(items.Count + start, 0) : Math.Min(start, items.Count);
    int to = end is int e ? (e < 0 ? Math.Max(items.Count + e, 0) : Math.Min(e, items.Count)) : items.Count;
    return items.Skip(from).Take(Math.Max(to - from, 0)).ToList();
}";

const SPLICE: &str = "\
internal static List<T> Splice<T>(List<T> list, int start, int? count = null, params T[] items)
{
    int from = start < 0 ? Math.Max(list.Count + start, 0) : Math.Min(start, list.Count);
    int removed = Math.Min(count ?? list.Count - from, list.Count - from);
    var deleted = list.GetRange(from, removed);
    list.RemoveRange(from, removed);
    list.InsertRange(from, items);
    return deleted;
}";

const FILL: &str = "\
internal static IList<T> Fill<T>(IList<T> items, T value, int start = 0, int? end = null)
{
    int from = start < 0 ? Math.Max(items.Count + start, 0) : Math.Min(start, items.Count);
    int to = end is int e ? (e < 0 ? Math.Max(items.Count + e, 0) : Math.Min(e, items.Count)) : items.Count;
    for (int i = from; i < to; i++)
    {
        items[i] = value;
    }
    return items;
}";

const XOR_BYTES: &str = "\
internal static byte[] XorBytes(IList<byte> left, IList<byte> right)
{
    var result = new byte[Math.Min(left.Count, right.Count)];
    for (int i = 0; i < result.Length; i++)
    {
        result[i] = (byte)(left[i] ^ right[i]);
    }
    return result;
}";

const REPLACE_FIRST: &str = "\
internal static string ReplaceFirst(string text, string search, string replacement)
{
    int at = text.IndexOf(search, StringComparison.Ordinal);
    return at < 0 ? text : text.Substring(0, at) + replacement + text.Substring(at + search.Length);
}";

const SUBSTRING: &str = "\
internal static string Substring(string text, int start, int? end = null)
{
    int from = Math.Clamp(start, 0, text.Length);
    int to = Math.Clamp(end ?? text.Length, 0, text.Length);
    return from <= to ? text.Substring(from, to - from) : text.Substring(to, from - to);
}";

const PAD_START: &str = "\
internal static string PadStart(string text, int length, string fill)
{
    int missing = length - text.Length;
    if (missing <= 0 || fill.Length == 0)
    {
        return text;
    }
    var padding = new System.Text.StringBuilder();
    while (padding.Length < missing)
    {
        padding.Append(fill);
    }
    return padding.ToString(0, missing) + text;
}";

const PAD_END: &str = "\
internal static string PadEnd(string text, int length, string fill)
{
    int missing = length - text.Length;
    if (missing <= 0 || fill.Length == 0)
    {
        return text;
    }
    var padding = new System.Text.StringBuilder();
    while (padding.Length < missing)
    {
        padding.Append(fill);
    }
    return text + padding.ToString(0, missing);
}";

const CHAR_AT: &str = "\
internal static string CharAt(string text, int index)
{
    return index >= 0 && index < text.Length ? text[index].ToString() : \"\";
}";
