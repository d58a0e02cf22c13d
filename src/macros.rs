/// Builds a [`Document`](crate::core::Document) from an id and a list of `field => value` pairs.
///
/// ```
/// use index_workspace::doc;
///
/// let document = doc!("book-1", "title" => "Dune", "author" => "Herbert");
/// assert_eq!(document.field("title"), Some("Dune"));
/// ```
#[macro_export]
macro_rules! doc(
    ($id:expr) => {
        {
            $crate::core::Document::new($id)
        }
    };
    ($id:expr, $($field:expr => $value:expr),*) => {
        {
            let mut document = $crate::core::Document::new($id);
            $(
                document.add_field($field, $value);
            )*
            document
        }
    };
    // if there is a trailing comma retry with the trailing comma stripped.
    ($id:expr, $($field:expr => $value:expr),+ ,) => {
        $crate::doc!($id, $( $field => $value ),*)
    };
);
