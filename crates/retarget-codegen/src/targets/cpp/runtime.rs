//! Support functions for operations the standard library has no single call
//! for. They are printed inside `namespace rt` ahead of the program, each at
//! most once, in declaration order so dependencies come first.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Helper {
    ClampIndex,
    ToString,
    Invoke,
    Pop,
    Shift,
    Slice,
    Splice,
    Concat,
    IndexOf,
    Join,
    Split,
    Substring,
    ReplaceFirst,
    ReplaceAll,
    ToUpper,
    ToLower,
    Trim,
    Repeat,
    PadStart,
    PadEnd,
    FromCharCodes,
    Chars,
    ToBytes,
    HexEncode,
    HexDecode,
    Base64Encode,
    Base64Decode,
    XorBytes,
    UnpackBytes,
    Map,
    Filter,
    Find,
    Reduce,
    Unique,
    Keys,
    Values,
    Entries,
    ToRadix,
    Random,
    Sort,
    Reverse,
    Fill,
    StartsWith,
    EndsWith,
    Clz32,
    Task,
}

impl Helper {
    /// Qualified name for call sites.
    pub fn path(self) -> &'static str {
        match self {
            Helper::ClampIndex => "rt::clamp_index",
            Helper::ToString => "rt::to_string",
            Helper::Invoke => "rt::invoke_each",
            Helper::Pop => "rt::pop",
            Helper::Shift => "rt::shift",
            Helper::Slice => "rt::slice",
            Helper::Splice => "rt::splice",
            Helper::Concat => "rt::concat",
            Helper::IndexOf => "rt::index_of",
            Helper::Join => "rt::join",
            Helper::Split => "rt::split",
            Helper::Substring => "rt::substring",
            Helper::ReplaceFirst => "rt::replace_first",
            Helper::ReplaceAll => "rt::replace_all",
            Helper::ToUpper => "rt::to_upper",
            Helper::ToLower => "rt::to_lower",
            Helper::Trim => "rt::trim",
            Helper::Repeat => "rt::repeat",
            Helper::PadStart => "rt::pad_start",
            Helper::PadEnd => "rt::pad_end",
            Helper::FromCharCodes => "rt::from_char_codes",
            Helper::Chars => "rt::chars",
            Helper::ToBytes => "rt::to_bytes",
            Helper::HexEncode => "rt::hex_encode",
            Helper::HexDecode => "rt::hex_decode",
            Helper::Base64Encode => "rt::base64_encode",
            Helper::Base64Decode => "rt::base64_decode",
            Helper::XorBytes => "rt::xor_bytes",
            Helper::UnpackBytes => "rt::unpack_bytes",
            Helper::Map => "rt::map",
            Helper::Filter => "rt::filter",
            Helper::Find => "rt::find",
            Helper::Reduce => "rt::reduce",
            Helper::Unique => "rt::unique",
            Helper::Keys => "rt::keys",
            Helper::Values => "rt::values",
            Helper::Entries => "rt::entries",
            Helper::ToRadix => "rt::to_radix",
            Helper::Random => "rt::random",
            Helper::Sort => "rt::sort",
            Helper::Reverse => "rt::reverse",
            Helper::Fill => "rt::fill",
            Helper::StartsWith => "rt::starts_with",
            Helper::EndsWith => "rt::ends_with",
            Helper::Clz32 => "rt::clz32",
            Helper::Task => "rt::Task",
        }
    }

    /// Helpers this one calls.
    pub fn requires(self) -> &'static [Helper] {
        match self {
            Helper::Slice | Helper::Splice | Helper::Fill => &[Helper::ClampIndex],
            Helper::Join => &[Helper::ToString],
            Helper::Map | Helper::Filter | Helper::Find => &[Helper::Invoke],
            _ => &[],
        }
    }

    /// Standard headers the helper's source needs.
    pub fn includes(self) -> &'static [&'static str] {
        match self {
            Helper::ClampIndex => &["algorithm", "cstddef"],
            Helper::ToString => &["sstream", "string", "type_traits"],
            Helper::Invoke => &["type_traits"],
            Helper::Slice | Helper::Splice | Helper::Fill => &["optional", "vector"],
            Helper::Substring => &["algorithm", "optional", "string"],
            Helper::ToUpper | Helper::ToLower => &["algorithm", "cctype", "string"],
            Helper::IndexOf | Helper::Unique => &["algorithm", "string", "vector"],
            Helper::Reduce => &["stdexcept", "vector"],
            Helper::Keys | Helper::Values | Helper::Entries => &["utility", "vector"],
            Helper::Random => &["random"],
            Helper::Sort | Helper::Reverse => &["algorithm", "vector"],
            Helper::Clz32 => &["cstdint"],
            Helper::Task => &["any", "coroutine", "exception", "utility"],
            _ => &["string", "vector"],
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Helper::ClampIndex => CLAMP_INDEX,
            Helper::ToString => TO_STRING,
            Helper::Invoke => INVOKE,
            Helper::Pop => POP,
            Helper::Shift => SHIFT,
            Helper::Slice => SLICE,
            Helper::Splice => SPLICE,
            Helper::Concat => CONCAT,
            Helper::IndexOf => INDEX_OF,
            Helper::Join => JOIN,
            Helper::Split => SPLIT,
            Helper::Substring => SUBSTRING,
            Helper::ReplaceFirst => REPLACE_FIRST,
            Helper::ReplaceAll => REPLACE_ALL,
            Helper::ToUpper => TO_UPPER,
            Helper::ToLower => TO_LOWER,
            Helper::Trim => TRIM,
            Helper::Repeat => REPEAT,
            Helper::PadStart => PAD_START,
            Helper::PadEnd => PAD_END,
            Helper::FromCharCodes => FROM_CHAR_CODES,
            Helper::Chars => CHARS,
            Helper::ToBytes => TO_BYTES,
            Helper::HexEncode => HEX_ENCODE,
            Helper::HexDecode => HEX_DECODE,
            Helper::Base64Encode => BASE64_ENCODE,
            Helper::Base64Decode => BASE64_DECODE,
            Helper::XorBytes => XOR_BYTES,
            Helper::UnpackBytes => UNPACK_BYTES,
            Helper::Map => MAP,
            Helper::Filter => FILTER,
            Helper::Find => FIND,
            Helper::Reduce => REDUCE,
            Helper::Unique => UNIQUE,
            Helper::Keys => KEYS,
            Helper::Values => VALUES,
            Helper::Entries => ENTRIES,
            Helper::ToRadix => TO_RADIX,
            Helper::Random => RANDOM,
            Helper::Sort => SORT,
            Helper::Reverse => REVERSE,
            Helper::Fill => FILL,
            Helper::StartsWith => STARTS_WITH,
            Helper::EndsWith => ENDS_WITH,
            Helper::Clz32 => CLZ32,
            Helper::Task => TASK,
        }
    }
}

const CLAMP_INDEX: &str = "\
inline std::size_t clamp_index(long long index, std::size_t size) {
    auto length = static_cast<long long>(size);
    if (index < 0) {
        index += length;
    }
    return static_cast<std::size_t>(std::clamp<long long>(index, 0, length));
}";

const TO_STRING: &str = "\
template <typename T>
std::string to_string(const T& value) {
    if constexpr (std::is_convertible_v<T, std::string>) {
        return std::string(value);
    } else if constexpr (std::is_same_v<T, bool>) {
        return value ? \"true\" : \"false\";
    } else if constexpr (std::is_integral_v<T>) {
        return std::to_string(value);
    } else {
        std::ostringstream out;
        out << value;
        return out.str();
    }
}";

const INVOKE: &str = "\
template <typename F, typename T>
decltype(auto) invoke_each(F& f, const T& item, std::size_t index) {
    if constexpr (std::is_invocable_v<F&, const T&, int>) {
        return f(item, static_cast<int>(index));
    } else {
        return f(item);
    }
}";

const POP: &str = "\
template <typename T>
T pop(std::vector<T>& items) {
    if (items.empty()) {
        return T{};
    }
    T last = items.back();
    items.pop_back();
    return last;
}";

const SHIFT: &str = "\
template <typename T>
T shift(std::vector<T>& items) {
    if (items.empty()) {
        return T{};
    }
    T first = items.front();
    items.erase(items.begin());
    return first;
}";

const SLICE: &str = "\
template <typename Seq>
Seq slice(const Seq& items, long long start = 0, std::optional<long long> end = std::nullopt) {
    std::size_t from = clamp_index(start, items.size());
    std::size_t to = end ? clamp_index(*end, items.size()) : items.size();
    if (to <= from) {
        return Seq{};
    }
    return Seq(items.begin() + from, items.begin() + to);
}";

const SPLICE: &str = "\
template <typename T>
std::vector<T> splice(std::vector<T>& items, long long start, std::optional<long long> count = std::nullopt,
                      std::vector<T> inserted = {}) {
    std::size_t from = clamp_index(start, items.size());
    auto available = static_cast<long long>(items.size() - from);
    auto removed = static_cast<std::size_t>(count ? std::clamp<long long>(*count, 0, available) : available);
    std::vector<T> deleted(items.begin() + from, items.begin() + from + removed);
    items.erase(items.begin() + from, items.begin() + from + removed);
    items.insert(items.begin() + from, inserted.begin(), inserted.end());
    return deleted;
}";

const CONCAT: &str = "\
template <typename T, typename... Rest>
std::vector<T> concat(std::vector<T> items, const Rest&... rest) {
    (items.insert(items.end(), rest.begin(), rest.end()), ...);
    return items;
}";

const INDEX_OF: &str = "\
inline int index_of(const std::string& text, const std::string& search) {
    auto at = text.find(search);
    return at == std::string::npos ? -1 : static_cast<int>(at);
}

template <typename T, typename U>
int index_of(const std::vector<T>& items, const U& value) {
    auto at = std::find(items.begin(), items.end(), value);
    return at == items.end() ? -1 : static_cast<int>(at - items.begin());
}";

const JOIN: &str = "\
template <typename T>
std::string join(const std::vector<T>& items, const std::string& separator = \",\") {
    std::string out;
    for (std::size_t i = 0; i < items.size(); ++i) {
        if (i > 0) {
            out += separator;
        }
        out += to_string(items[i]);
    }
    return out;
}";

const SPLIT: &str = "\
inline std::vector<std::string> split(const std::string& text, const std::string& separator) {
    std::vector<std::string> parts;
    if (separator.empty()) {
        for (char c : text) {
            parts.emplace_back(1, c);
        }
        return parts;
    }
    std::size_t start = 0;
    for (auto at = text.find(separator); at != std::string::npos; at = text.find(separator, start)) {
        parts.push_back(text.substr(start, at - start));
        start = at + separator.size();
    }
    parts.push_back(text.substr(start));
    return parts;
}";

const SUBSTRING: &str = "\
inline std::string substring(const std::string& text, long long start, std::optional<long long> end = std::nullopt) {
    auto size = static_cast<long long>(text.size());
    auto from = std::clamp<long long>(start, 0, size);
    auto to = std::clamp<long long>(end.value_or(size), 0, size);
    if (from > to) {
        std::swap(from, to);
    }
    return text.substr(static_cast<std::size_t>(from), static_cast<std::size_t>(to - from));
}";

const REPLACE_FIRST: &str = "\
inline std::string replace_first(std::string text, const std::string& search, const std::string& replacement) {
    auto at = text.find(search);
    if (at != std::string::npos) {
        text.replace(at, search.size(), replacement);
    }
    return text;
}";

const REPLACE_ALL: &str = "\
inline std::string replace_all(std::string text, const std::string& search, const std::string& replacement) {
    if (search.empty()) {
        return text;
    }
    for (auto at = text.find(search); at != std::string::npos; at = text.find(search, at + replacement.size())) {
        text.replace(at, search.size(), replacement);
    }
    return text;
}";

const TO_UPPER: &str = "\
inline std::string to_upper(std::string text) {
    std::transform(text.begin(), text.end(), text.begin(),
                   [](unsigned char c) { return static_cast<char>(std::toupper(c)); });
    return text;
}";

const TO_LOWER: &str = "\
inline std::string to_lower(std::string text) {
    std::transform(text.begin(), text.end(), text.begin(),
                   [](unsigned char c) { return static_cast<char>(std::tolower(c)); });
    return text;
}";

const TRIM: &str = "\
inline std::string trim(const std::string& text) {
    auto first = text.find_first_not_of(\" \\t\\n\\r\\f\\v\");
    if (first == std::string::npos) {
        return \"\";
    }
    auto last = text.find_last_not_of(\" \\t\\n\\r\\f\\v\");
    return text.substr(first, last - first + 1);
}";

const REPEAT: &str = "\
inline std::string repeat(const std::string& text, long long count) {
    std::string out;
    for (long long i = 0; i < count; ++i) {
        out += text;
    }
    return out;
}";

const PAD_START: &str = "\
inline std::string pad_start(const std::string& text, std::size_t length, const std::string& fill = \" \") {
    if (text.size() >= length || fill.empty()) {
        return text;
    }
    std::string padding;
    while (padding.size() < length - text.size()) {
        padding += fill;
    }
    return padding.substr(0, length - text.size()) + text;
}";

const PAD_END: &str = "\
inline std::string pad_end(const std::string& text, std::size_t length, const std::string& fill = \" \") {
    if (text.size() >= length || fill.empty()) {
        return text;
    }
    std::string padding;
    while (padding.size() < length - text.size()) {
        padding += fill;
    }
    return text + padding.substr(0, length - text.size());
}";

const FROM_CHAR_CODES: &str = "\
template <typename T>
std::string from_char_codes(const std::vector<T>& codes) {
    std::string out;
    out.reserve(codes.size());
    for (const auto& code : codes) {
        out.push_back(static_cast<char>(code));
    }
    return out;
}";

const CHARS: &str = "\
inline std::vector<std::string> chars(const std::string& text) {
    std::vector<std::string> out;
    for (char c : text) {
        out.emplace_back(1, c);
    }
    return out;
}";

const TO_BYTES: &str = "\
inline std::vector<uint8_t> to_bytes(const std::string& text) {
    return std::vector<uint8_t>(text.begin(), text.end());
}";

const HEX_ENCODE: &str = "\
template <typename T>
std::string hex_encode(const std::vector<T>& bytes) {
    static constexpr char digits[] = \"0123456789abcdef\";
    std::string out;
    out.reserve(bytes.size() * 2);
    for (const auto& value : bytes) {
        auto byte = static_cast<uint8_t>(value);
        out.push_back(digits[byte >> 4]);
        out.push_back(digits[byte & 0x0F]);
    }
    return out;
}";

const HEX_DECODE: &str = "\
inline std::vector<uint8_t> hex_decode(const std::string& text) {
    std::vector<uint8_t> out;
    out.reserve(text.size() / 2);
    for (std::size_t i = 0; i + 1 < text.size(); i += 2) {
        out.push_back(static_cast<uint8_t>(std::stoi(text.substr(i, 2), nullptr, 16)));
    }
    return out;
}";

const BASE64_ENCODE: &str = "\
template <typename T>
std::string base64_encode(const std::vector<T>& bytes) {
    static constexpr char alphabet[] = \"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/\";
    std::string out;
    std::size_t i = 0;
    for (; i + 2 < bytes.size(); i += 3) {
        uint32_t n = static_cast<uint32_t>(static_cast<uint8_t>(bytes[i])) << 16 |
                     static_cast<uint32_t>(static_cast<uint8_t>(bytes[i + 1])) << 8 |
                     static_cast<uint8_t>(bytes[i + 2]);
        out.push_back(alphabet[(n >> 18) & 63]);
        out.push_back(alphabet[(n >> 12) & 63]);
        out.push_back(alphabet[(n >> 6) & 63]);
        out.push_back(alphabet[n & 63]);
    }
    if (i < bytes.size()) {
        uint32_t n = static_cast<uint32_t>(static_cast<uint8_t>(bytes[i])) << 16;
        bool two = i + 1 < bytes.size();
        if (two) {
            n |= static_cast<uint32_t>(static_cast<uint8_t>(bytes[i + 1])) << 8;
        }
        out.push_back(alphabet[(n >> 18) & 63]);
        out.push_back(alphabet[(n >> 12) & 63]);
        out.push_back(two ? alphabet[(n >> 6) & 63] : '=');
        out.push_back('=');
    }
    return out;
}";

const BASE64_DECODE: &str = "\
inline std::vector<uint8_t> base64_decode(const std::string& text) {
    std::vector<uint8_t> out;
    uint32_t buffer = 0;
    int bits = 0;
    for (char c : text) {
        uint32_t value;
        if (c >= 'A' && c <= 'Z') {
            value = static_cast<uint32_t>(c - 'A');
        } else if (c >= 'a' && c <= 'z') {
            value = static_cast<uint32_t>(c - 'a' + 26);
        } else if (c >= '0' && c <= '9') {
            value = static_cast<uint32_t>(c - '0' + 52);
        } else if (c == '+' || c == '-') {
            value = 62;
        } else if (c == '/' || c == '_') {
            value = 63;
        } else {
            continue;
        }
        buffer = (buffer << 6) | value;
        bits += 6;
        if (bits >= 8) {
            bits -= 8;
            out.push_back(static_cast<uint8_t>((buffer >> bits) & 0xFF));
        }
    }
    return out;
}";

const XOR_BYTES: &str = "\
template <typename T, typename U>
std::vector<uint8_t> xor_bytes(const std::vector<T>& left, const std::vector<U>& right) {
    std::vector<uint8_t> out(std::min(left.size(), right.size()));
    for (std::size_t i = 0; i < out.size(); ++i) {
        out[i] = static_cast<uint8_t>(left[i] ^ right[i]);
    }
    return out;
}";

const UNPACK_BYTES: &str = "\
inline std::vector<uint8_t> unpack_bytes(uint64_t value, int width, bool big_endian) {
    std::vector<uint8_t> out(static_cast<std::size_t>(width));
    for (int i = 0; i < width; ++i) {
        int shift = big_endian ? (width - 1 - i) * 8 : i * 8;
        out[static_cast<std::size_t>(i)] = static_cast<uint8_t>((value >> shift) & 0xFF);
    }
    return out;
}";

const MAP: &str = "\
template <typename T, typename F>
auto map(const std::vector<T>& items, F f) {
    using R = std::decay_t<decltype(invoke_each(f, std::declval<const T&>(), std::size_t{}))>;
    std::vector<R> out;
    out.reserve(items.size());
    for (std::size_t i = 0; i < items.size(); ++i) {
        out.push_back(invoke_each(f, items[i], i));
    }
    return out;
}";

const FILTER: &str = "\
template <typename T, typename F>
std::vector<T> filter(const std::vector<T>& items, F f) {
    std::vector<T> out;
    for (std::size_t i = 0; i < items.size(); ++i) {
        if (invoke_each(f, items[i], i)) {
            out.push_back(items[i]);
        }
    }
    return out;
}";

const FIND: &str = "\
template <typename T, typename F>
T find(const std::vector<T>& items, F f) {
    for (std::size_t i = 0; i < items.size(); ++i) {
        if (invoke_each(f, items[i], i)) {
            return items[i];
        }
    }
    return T{};
}";

const REDUCE: &str = "\
template <typename T, typename F>
T reduce(const std::vector<T>& items, F f) {
    if (items.empty()) {
        throw std::runtime_error(\"reduce of empty array with no initial value\");
    }
    T acc = items[0];
    for (std::size_t i = 1; i < items.size(); ++i) {
        acc = f(acc, items[i]);
    }
    return acc;
}";

const UNIQUE: &str = "\
template <typename T>
std::vector<T> unique(const std::vector<T>& items) {
    std::vector<T> out;
    for (const auto& item : items) {
        if (std::find(out.begin(), out.end(), item) == out.end()) {
            out.push_back(item);
        }
    }
    return out;
}";

const KEYS: &str = "\
template <typename Map>
auto keys(const Map& map) {
    std::vector<typename Map::key_type> out;
    out.reserve(map.size());
    for (const auto& entry : map) {
        out.push_back(entry.first);
    }
    return out;
}";

const VALUES: &str = "\
template <typename Map>
auto values(const Map& map) {
    std::vector<typename Map::mapped_type> out;
    out.reserve(map.size());
    for (const auto& entry : map) {
        out.push_back(entry.second);
    }
    return out;
}";

const ENTRIES: &str = "\
template <typename Map>
auto entries(const Map& map) {
    return std::vector<std::pair<typename Map::key_type, typename Map::mapped_type>>(map.begin(), map.end());
}";

const TO_RADIX: &str = "\
inline std::string to_radix(long long value, int radix) {
    static constexpr char digits[] = \"0123456789abcdefghijklmnopqrstuvwxyz\";
    if (value == 0) {
        return \"0\";
    }
    bool negative = value < 0;
    auto n = negative ? 0ULL - static_cast<unsigned long long>(value) : static_cast<unsigned long long>(value);
    std::string out;
    while (n > 0) {
        out.insert(out.begin(), digits[n % static_cast<unsigned long long>(radix)]);
        n /= static_cast<unsigned long long>(radix);
    }
    return negative ? \"-\" + out : out;
}";

const RANDOM: &str = "\
inline double random() {
    static std::mt19937_64 engine{std::random_device{}()};
    return std::uniform_real_distribution<double>(0.0, 1.0)(engine);
}";

const SORT: &str = "\
template <typename T>
std::vector<T>& sort(std::vector<T>& items) {
    std::sort(items.begin(), items.end());
    return items;
}

template <typename T, typename F>
std::vector<T>& sort(std::vector<T>& items, F compare) {
    std::sort(items.begin(), items.end(), [&](const T& a, const T& b) { return compare(a, b) < 0; });
    return items;
}";

const REVERSE: &str = "\
template <typename T>
std::vector<T>& reverse(std::vector<T>& items) {
    std::reverse(items.begin(), items.end());
    return items;
}";

const FILL: &str = "\
template <typename T, typename U>
std::vector<T>& fill(std::vector<T>& items, const U& value, long long start = 0,
                     std::optional<long long> end = std::nullopt) {
    std::size_t from = clamp_index(start, items.size());
    std::size_t to = end ? clamp_index(*end, items.size()) : items.size();
    for (std::size_t i = from; i < to; ++i) {
        items[i] = static_cast<T>(value);
    }
    return items;
}";

const STARTS_WITH: &str = "\
inline bool starts_with(const std::string& text, const std::string& prefix) {
    return text.rfind(prefix, 0) == 0;
}";

const ENDS_WITH: &str = "\
inline bool ends_with(const std::string& text, const std::string& suffix) {
    return text.size() >= suffix.size() &&
           text.compare(text.size() - suffix.size(), suffix.size(), suffix) == 0;
}";

const CLZ32: &str = "\
inline int clz32(uint32_t value) {
    int count = 0;
    for (uint32_t mask = 0x80000000u; mask != 0 && (value & mask) == 0; mask >>= 1) {
        ++count;
    }
    return count;
}";

const TASK: &str = "\
// Eager coroutine result: the body runs to completion when called.
struct Task {
    struct promise_type {
        std::any value;
        std::exception_ptr error;

        Task get_return_object() {
            return Task{std::coroutine_handle<promise_type>::from_promise(*this)};
        }
        std::suspend_never initial_suspend() noexcept { return {}; }
        std::suspend_always final_suspend() noexcept { return {}; }
        void return_value(std::any result) { value = std::move(result); }
        void unhandled_exception() { error = std::current_exception(); }
    };

    explicit Task(std::coroutine_handle<promise_type> handle) : handle(handle) {}
    Task(Task&& other) noexcept : handle(std::exchange(other.handle, {})) {}
    Task(const Task&) = delete;
    ~Task() {
        if (handle) {
            handle.destroy();
        }
    }

    bool await_ready() const noexcept { return true; }
    void await_suspend(std::coroutine_handle<>) const noexcept {}
    std::any await_resume() const {
        if (handle.promise().error) {
            std::rethrow_exception(handle.promise().error);
        }
        return handle.promise().value;
    }

    std::coroutine_handle<promise_type> handle;
};";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_sort_before_their_users() {
        for helper in [Helper::Slice, Helper::Join, Helper::Map, Helper::Fill] {
            for dependency in helper.requires() {
                assert!(dependency < &helper, "{helper:?} needs {dependency:?} first");
            }
        }
    }

    #[test]
    fn test_paths_are_namespaced() {
        assert_eq!(Helper::Slice.path(), "rt::slice");
        assert!(Helper::Task.source().contains("struct Task"));
    }
}
