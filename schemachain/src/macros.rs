//! Convenience macros for declaring records.

/// Declare a struct and derive its [`Record`](crate::Record) implementation.
///
/// Each field type must implement [`SqlField`](crate::SqlField). Field attributes describe
/// the column:
///
/// - `#[orm = "pk,ai"]` - directives, see [`Annotations`](crate::Annotations)
/// - `#[db = "column_name"]` - explicit column name
/// - `#[default = "literal"]` - `DEFAULT 'literal'` clause in `CREATE TABLE`
///
/// Field attributes are consumed by the macro and not emitted on the struct.
/// Struct level attributes (derives, docs) are kept.
///
/// ```
/// use schemachain::{record, build_create_table, CreateTableOptions, Dialect};
///
/// record! {
///     #[derive(Debug, Default)]
///     pub struct Account {
///         #[orm = "pk,ai"]
///         #[db = "ID"]
///         pub id: i32,
///         #[db = "Name"]
///         pub name: String,
///     }
/// }
///
/// let sql = build_create_table::<Account>(Dialect::Mysql, &CreateTableOptions::default()).unwrap();
/// assert_eq!(
///     sql,
///     "CREATE TABLE `Account` (`ID` INT AUTO_INCREMENT, `Name` TEXT, PRIMARY KEY (`ID`))"
/// );
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$($field_attr:tt)*])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $field_vis $field: $field_ty, )*
        }

        impl $crate::Record for $name {
            fn shape() -> $crate::RecordShape {
                $crate::RecordShape::new(stringify!($name))
                    $(
                        .field({
                            #[allow(unused_mut)]
                            let mut def = $crate::FieldDef::new(
                                stringify!($field),
                                <$field_ty as $crate::SqlField>::field_type(),
                            );
                            $( $crate::__record_field_attr!(def, $($field_attr)*); )*
                            def
                        })
                    )*
            }

            fn values(&self) -> ::std::vec::Vec<$crate::Value> {
                ::std::vec![ $( $crate::SqlField::to_value(&self.$field) ),* ]
            }

            fn fields_mut(&mut self) -> ::std::vec::Vec<&mut dyn $crate::SqlField> {
                ::std::vec![ $( &mut self.$field as &mut dyn $crate::SqlField ),* ]
            }
        }
    };
}

/// Applies one field attribute of [`record!`] to a `FieldDef` binding.
#[macro_export]
#[doc(hidden)]
macro_rules! __record_field_attr {
    ($def:ident, orm = $tag:literal) => {
        $def = $def.orm($tag);
    };
    ($def:ident, db = $column:literal) => {
        $def = $def.column($column);
    };
    ($def:ident, default = $value:literal) => {
        $def = $def.default_value($value);
    };
    // doc comments and anything else
    ($def:ident, $($other:tt)*) => {};
}
