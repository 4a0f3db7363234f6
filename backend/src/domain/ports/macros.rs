//! Defines helper macros for generating domain port error enums.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use uuid::Uuid;

    define_port_error! {
        pub enum ShelfPortError {
            Offline => "shelf offline",
            Jammed { message: String } => "shelf jammed: {message}",
            Missing { book_id: u64 } => "book {book_id} missing",
            Held { book_id: u64, holder: String } => "book {book_id} held by {holder}",
            Orphaned { intent_id: Uuid } => "intent {intent_id} orphaned",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(ShelfPortError::offline(), ShelfPortError::Offline);
        assert_eq!(ShelfPortError::offline().to_string(), "shelf offline");
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ShelfPortError::jammed("door stuck");
        assert_eq!(err.to_string(), "shelf jammed: door stuck");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = ShelfPortError::missing(7_u64);
        assert_eq!(err, ShelfPortError::Missing { book_id: 7 });
        assert_eq!(err.to_string(), "book 7 missing");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = ShelfPortError::held(7_u64, "u1");
        assert_eq!(err.to_string(), "book 7 held by u1");
    }

    #[test]
    fn constructors_accept_uuid_fields() {
        let id = Uuid::nil();
        assert_eq!(
            ShelfPortError::orphaned(id).to_string(),
            format!("intent {id} orphaned")
        );
    }
}
