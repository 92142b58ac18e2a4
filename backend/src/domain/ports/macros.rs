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
    //! Regression coverage for the generated constructors.
    define_port_error! {
        pub enum SamplePortError {
            Unreachable => "probe target unreachable",
            Refused { message: String } => "probe refused: {message}",
            Status { status: u16 } => "probe status {status}",
            Slow { message: String, elapsed_ms: u64 } => "probe slow: {message} ({elapsed_ms} ms)",
        }
    }

    #[test]
    fn unit_variants_get_snake_case_constructors() {
        let err = SamplePortError::unreachable();
        assert_eq!(err.to_string(), "probe target unreachable");
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = SamplePortError::refused("connection reset");
        assert_eq!(err.to_string(), "probe refused: connection reset");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = SamplePortError::status(503_u16);
        assert_eq!(err.to_string(), "probe status 503");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = SamplePortError::slow("laps", 1_250_u64);
        assert_eq!(err.to_string(), "probe slow: laps (1250 ms)");
    }
}
