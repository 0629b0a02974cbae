//! Payload Generation Macros
//!
//! Declarative generators for the payload catalogue:
//!
//! - `define_payload!` emits one payload struct and its [`PayloadFields`]
//!   impl, reading and writing fields in declaration order
//! - `define_family!` emits a family's SubType enum, its closed payload enum
//!   and the [`PayloadShape`] glue for each member
//! - `define_payload_set!` emits the top-level [`Payload`] union
//!
//! Field declaration order *is* the wire layout. Appending a field changes the
//! wire contract of that SubType, so new fields belong in a new SubType.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! define_payload! {
//!     /// Text sent to a named channel
//!     ChatChannelMessage {
//!         from: String,
//!         channel: String,
//!         text: String,
//!     }
//! }
//!
//! define_family! {
//!     /// Chat traffic
//!     Chat => ChatPayload, ChatMessageType {
//!         ChannelMessage = 4 => ChatChannelMessage,
//!     }
//! }
//! ```
//!
//! [`PayloadFields`]: crate::wire::PayloadFields
//! [`PayloadShape`]: crate::payload::PayloadShape
//! [`Payload`]: crate::payload::Payload

/// Generate a payload struct with ordered field codec
macro_rules! define_payload {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl $crate::wire::PayloadFields for $name {
            #[allow(unused_variables)]
            fn write_fields(
                &self,
                writer: &mut $crate::wire::WireWriter<'_>,
            ) -> Result<(), $crate::wire::WireError> {
                $( $crate::wire::WireField::write_to(&self.$field, writer)?; )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn read_fields(
                &mut self,
                reader: &mut $crate::wire::WireReader<'_>,
            ) -> Result<(), $crate::wire::WireError> {
                $( $crate::wire::WireField::read_from(&mut self.$field, reader)?; )*
                Ok(())
            }

            fn reset(&mut self) {
                $( $crate::wire::WireField::reset(&mut self.$field); )*
            }
        }
    };
}

/// Generate a family's SubType enum and closed payload enum
macro_rules! define_family {
    (
        $(#[$meta:meta])*
        $message_type:ident => $family:ident, $sub:ident {
            $( $variant:ident = $value:literal => $shape:ident ),+ $(,)?
        }
    ) => {
        /// SubType discriminator, header bytes 2-3
        #[repr(u16)]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::num_enum::TryFromPrimitive,
            ::num_enum::IntoPrimitive,
        )]
        pub enum $sub {
            $( $variant = $value, )+
        }

        impl $sub {
            pub const ALL: &'static [$sub] = &[ $( $sub::$variant, )+ ];

            pub fn shape_name(self) -> &'static str {
                match self {
                    $( $sub::$variant => stringify!($shape), )+
                }
            }
        }

        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $family {
            $( $variant($shape), )+
        }

        impl $family {
            pub fn sub_type(&self) -> $sub {
                match self {
                    $( $family::$variant(_) => $sub::$variant, )+
                }
            }

            /// Default-valued payload of the given shape
            pub fn empty(sub_type: $sub) -> Self {
                match sub_type {
                    $( $sub::$variant => $family::$variant(<$shape>::default()), )+
                }
            }

            pub fn shape_name(&self) -> &'static str {
                self.sub_type().shape_name()
            }
        }

        impl $crate::wire::PayloadFields for $family {
            fn write_fields(
                &self,
                writer: &mut $crate::wire::WireWriter<'_>,
            ) -> Result<(), $crate::wire::WireError> {
                match self {
                    $( $family::$variant(inner) => $crate::wire::PayloadFields::write_fields(inner, writer), )+
                }
            }

            fn read_fields(
                &mut self,
                reader: &mut $crate::wire::WireReader<'_>,
            ) -> Result<(), $crate::wire::WireError> {
                match self {
                    $( $family::$variant(inner) => $crate::wire::PayloadFields::read_fields(inner, reader), )+
                }
            }

            fn reset(&mut self) {
                match self {
                    $( $family::$variant(inner) => $crate::wire::PayloadFields::reset(inner), )+
                }
            }
        }

        $(
            impl From<$shape> for $family {
                fn from(shape: $shape) -> Self {
                    $family::$variant(shape)
                }
            }

            impl From<$shape> for $crate::payload::Payload {
                fn from(shape: $shape) -> Self {
                    $crate::payload::Payload::$message_type($family::$variant(shape))
                }
            }

            impl $crate::payload::PayloadShape for $shape {
                const MESSAGE_TYPE: $crate::protocol::MessageType =
                    $crate::protocol::MessageType::$message_type;
                const SUB_TYPE: u16 = $value;
                const NAME: &'static str = stringify!($shape);

                fn from_payload(payload: &$crate::payload::Payload) -> Option<&Self> {
                    match payload {
                        $crate::payload::Payload::$message_type($family::$variant(inner)) => {
                            Some(inner)
                        }
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_payload_mut(payload: &mut $crate::payload::Payload) -> Option<&mut Self> {
                    match payload {
                        $crate::payload::Payload::$message_type($family::$variant(inner)) => {
                            Some(inner)
                        }
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }
        )+
    };
}

/// Generate the top-level payload union over every family
macro_rules! define_payload_set {
    (
        $( $message_type:ident => $family:ident, $sub:ident; )+
    ) => {
        /// Any payload of any registered shape
        #[derive(Debug, Clone, PartialEq)]
        pub enum Payload {
            $( $message_type($family), )+
        }

        impl Payload {
            pub fn message_type(&self) -> $crate::protocol::MessageType {
                match self {
                    $( Payload::$message_type(_) => $crate::protocol::MessageType::$message_type, )+
                }
            }

            pub fn sub_type(&self) -> u16 {
                match self {
                    $( Payload::$message_type(inner) => u16::from(inner.sub_type()), )+
                }
            }

            pub fn shape_name(&self) -> &'static str {
                match self {
                    $( Payload::$message_type(inner) => inner.shape_name(), )+
                }
            }

            /// Default-valued payload for a `(MessageType, SubType)` pair,
            /// `None` when the family declares no such SubType
            pub fn empty(message_type: $crate::protocol::MessageType, sub_type: u16) -> Option<Payload> {
                match message_type {
                    $(
                        $crate::protocol::MessageType::$message_type => <$sub>::try_from(sub_type)
                            .ok()
                            .map(|sub| Payload::$message_type(<$family>::empty(sub))),
                    )+
                }
            }

            /// Every SubType the family declares, in declaration order
            pub fn declared_sub_types(message_type: $crate::protocol::MessageType) -> Vec<u16> {
                match message_type {
                    $(
                        $crate::protocol::MessageType::$message_type => {
                            <$sub>::ALL.iter().map(|sub| u16::from(*sub)).collect()
                        }
                    )+
                }
            }
        }

        impl $crate::wire::PayloadFields for Payload {
            fn write_fields(
                &self,
                writer: &mut $crate::wire::WireWriter<'_>,
            ) -> Result<(), $crate::wire::WireError> {
                match self {
                    $( Payload::$message_type(inner) => $crate::wire::PayloadFields::write_fields(inner, writer), )+
                }
            }

            fn read_fields(
                &mut self,
                reader: &mut $crate::wire::WireReader<'_>,
            ) -> Result<(), $crate::wire::WireError> {
                match self {
                    $( Payload::$message_type(inner) => $crate::wire::PayloadFields::read_fields(inner, reader), )+
                }
            }

            fn reset(&mut self) {
                match self {
                    $( Payload::$message_type(inner) => $crate::wire::PayloadFields::reset(inner), )+
                }
            }
        }

        $(
            impl From<$family> for Payload {
                fn from(family: $family) -> Self {
                    Payload::$message_type(family)
                }
            }
        )+
    };
}
