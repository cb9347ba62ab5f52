//! Procedural macros for fmuvars models
//!
//! # Overview
//!
//! The `Attributes` derive implements `fmuvars_core::binding::Attributes` for a
//! struct with named fields, giving the binding resolver name-based access to the
//! fields without reflection:
//! - every field is readable and writable under its Rust name, converted through
//!   `fmuvars_core::value::AttributeValue`
//! - `#[attributes(rename = "...")]` exposes a field under another name
//! - `#[attributes(nested)]` exposes a field as a child object, so that dotted
//!   variable names such as `ball.h` can walk into it
//! - `#[attributes(skip)]` hides a field (required for types that are not
//!   attribute values)
//!
//! # Example
//!
//! ```ignore
//! use fmuvars_core::Attributes;
//!
//! #[derive(Attributes)]
//! pub struct BouncingBall {
//!     time: f64,
//!     #[attributes(nested)]
//!     ball: Ball,
//!     #[attributes(rename = "v_min")]
//!     minimum_speed: f64,
//!     #[attributes(skip)]
//!     history: Vec<(f64, f64)>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr, Type};

/// How a field is exposed
enum FieldRole {
    Value,
    Nested,
}

/// Metadata for an exposed field
struct ExposedField {
    rust_name: Ident,
    exposed_name: String,
    ty: Type,
    role: FieldRole,
}

/// Parse the #[attributes(...)] options of a field using syn 2.0 API
///
/// Returns `None` when the field is skipped.
fn parse_field(field: &syn::Field) -> syn::Result<Option<ExposedField>> {
    let rust_name = match &field.ident {
        Some(ident) => ident.clone(),
        None => {
            return Err(syn::Error::new_spanned(
                field,
                "Attributes can only be derived for structs with named fields",
            ))
        }
    };

    let mut skip = false;
    let mut nested = false;
    let mut rename = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("attributes") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
            } else if meta.path.is_ident("nested") {
                nested = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
            } else {
                return Err(meta.error("expected `skip`, `nested` or `rename`"));
            }
            Ok(())
        })?;
    }

    if skip {
        return Ok(None);
    }

    // Raw identifiers are exposed without their prefix
    let rust_text = rust_name.to_string();
    let exposed_name = rename.unwrap_or_else(|| rust_text.trim_start_matches("r#").to_string());

    Ok(Some(ExposedField {
        rust_name,
        exposed_name,
        ty: field.ty.clone(),
        role: if nested {
            FieldRole::Nested
        } else {
            FieldRole::Value
        },
    }))
}

fn extract_fields(input: &DeriveInput) -> syn::Result<Vec<ExposedField>> {
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Attributes can only be derived for structs",
            ))
        }
    };

    match fields {
        Fields::Named(named) => {
            let mut exposed = Vec::new();
            for field in &named.named {
                if let Some(field) = parse_field(field)? {
                    exposed.push(field);
                }
            }
            Ok(exposed)
        }
        Fields::Unit => Ok(Vec::new()),
        Fields::Unnamed(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Attributes can only be derived for structs with named fields",
        )),
    }
}

/// Generate the match arms for value fields
fn value_arms(fields: &[&ExposedField]) -> (Vec<TokenStream2>, Vec<TokenStream2>) {
    let getters = fields
        .iter()
        .map(|f| {
            let rust_name = &f.rust_name;
            let name = &f.exposed_name;
            quote! {
                #name => Some(::fmuvars_core::value::AttributeValue::to_value(&self.#rust_name)),
            }
        })
        .collect();

    let setters = fields
        .iter()
        .map(|f| {
            let rust_name = &f.rust_name;
            let name = &f.exposed_name;
            let ty = &f.ty;
            quote! {
                #name => {
                    let found = value.type_name();
                    self.#rust_name = <#ty as ::fmuvars_core::value::AttributeValue>::from_value(value)
                        .ok_or_else(|| ::fmuvars_core::errors::FmuError::InvalidValue {
                            name: #name.to_string(),
                            expected: <#ty as ::fmuvars_core::value::AttributeValue>::KIND,
                            found: found.to_string(),
                        })?;
                    Ok(())
                }
            }
        })
        .collect();

    (getters, setters)
}

/// Derive macro for name-based attribute access
///
/// # Attributes
///
/// ## Field attributes
/// - `#[attributes(skip)]` - Do not expose the field
/// - `#[attributes(nested)]` - Expose the field as a child object; its type must
///   implement `Attributes`
/// - `#[attributes(rename = "...")]` - Expose the field under another name
#[proc_macro_derive(Attributes, attributes(attributes))]
pub fn derive_attributes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match extract_fields(&input) {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };

    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let values: Vec<&ExposedField> = fields
        .iter()
        .filter(|f| matches!(f.role, FieldRole::Value))
        .collect();
    let nested: Vec<&ExposedField> = fields
        .iter()
        .filter(|f| matches!(f.role, FieldRole::Nested))
        .collect();

    let (getter_arms, setter_arms) = value_arms(&values);
    let value_names: Vec<&String> = values.iter().map(|f| &f.exposed_name).collect();
    let nested_names: Vec<&String> = nested.iter().map(|f| &f.exposed_name).collect();
    let nested_fields: Vec<&Ident> = nested.iter().map(|f| &f.rust_name).collect();

    let expanded = quote! {
        impl #impl_generics ::fmuvars_core::binding::Attributes for #struct_name #ty_generics #where_clause {
            fn get_attribute(&self, name: &str) -> Option<::fmuvars_core::value::Value> {
                match name {
                    #(#getter_arms)*
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn set_attribute(
                &mut self,
                name: &str,
                value: ::fmuvars_core::value::Value,
            ) -> ::fmuvars_core::errors::FmuResult<()> {
                match name {
                    #(#setter_arms)*
                    _ => Err(::fmuvars_core::errors::FmuError::UnknownAttribute(name.to_string())),
                }
            }

            fn has_attribute(&self, name: &str) -> bool {
                match name {
                    #(#value_names => true,)*
                    _ => false,
                }
            }

            fn child(&self, name: &str) -> Option<&dyn ::fmuvars_core::binding::Attributes> {
                match name {
                    #(#nested_names => Some(&self.#nested_fields),)*
                    _ => None,
                }
            }

            fn child_mut(&mut self, name: &str) -> Option<&mut dyn ::fmuvars_core::binding::Attributes> {
                match name {
                    #(#nested_names => Some(&mut self.#nested_fields),)*
                    _ => None,
                }
            }
        }
    };

    TokenStream::from(expanded)
}
