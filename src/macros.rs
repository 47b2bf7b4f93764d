/// Convenient construction of a [`Value`][crate::Value].
///
/// Braces construct a map, square brackets construct a list, and anything
/// else is converted using [`Value::from`][crate::Value]. Map keys are bare
/// identifiers.
///
/// # Examples
///
/// ```
/// let ctx = quill::value! {
///     {
///         user: {
///             name: "John Smith",
///             labels: ["regular"],
///         },
///         age: 29,
///     }
/// };
/// ```
#[macro_export]
macro_rules! value {
    ([ $($v:tt),* $(,)? ]) => {{
        #[allow(unused_mut)]
        let mut list = $crate::value::List::new();
        $( list.push($crate::value!($v)); )*
        $crate::Value::List(list)
    }};
    ({ $($k:ident : $v:tt),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut map = $crate::value::Map::new();
        $( map.insert(::std::string::String::from(stringify!($k)), $crate::value!($v)); )*
        $crate::Value::Map(map)
    }};
    ($v:expr) => {
        $crate::Value::from($v)
    };
}
