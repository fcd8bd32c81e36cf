use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, parse_macro_input, spanned::Spanned};

/// Derives `keyed_envelope::KeyedRecord`.
///
/// ```ignore
/// #[derive(Serialize, Deserialize, KeyedRecord)]
/// #[keyed(partition_key = "USER#{id}", sort_key = "PROFILE")]
/// struct User {
///     id: Uuid,
///     name: String,
/// }
/// ```
///
/// Container options: `partition_key = "..."`, `sort_key = "..."`,
/// `partition_key_name = "..."`, `sort_key_name = "..."`, `no_sort_key`.
/// Field options: `#[keyed(partition_key)]`, `#[keyed(sort_key)]`. A sort key
/// field of type `Option<_>` reports an absent sort key when it is `None`.
#[proc_macro_derive(KeyedRecord, attributes(keyed))]
pub fn derive_keyed_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_keyed_record(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct KeyedOptions {
    partition_key: Option<LitStr>,
    sort_key: Option<LitStr>,
    partition_key_name: Option<LitStr>,
    sort_key_name: Option<LitStr>,
    no_sort_key: bool,
}

#[derive(Default)]
struct KeyedFieldOptions {
    partition_key: bool,
    sort_key: bool,
}

/// Where a key value comes from.
enum KeySource {
    Template(LitStr),
    Field { ident: Ident, optional: bool },
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

fn expand_keyed_record(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "KeyedRecord does not support generic structs yet",
        ));
    }

    let options = parse_keyed_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "KeyedRecord can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "KeyedRecord requires named fields",
            ));
        }
    };

    let mut field_idents = Vec::<Ident>::new();
    let mut partition_field: Option<(Ident, bool)> = None;
    let mut sort_field: Option<(Ident, bool)> = None;

    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "KeyedRecord requires named fields"))?;
        let field_options = parse_keyed_field_options(&field.attrs)?;
        let optional = is_option(&field.ty);

        if field_options.partition_key {
            if partition_field.is_some() {
                return Err(syn::Error::new(
                    ident.span(),
                    "Only one field can be marked #[keyed(partition_key)]",
                ));
            }
            if optional {
                return Err(syn::Error::new(
                    ident.span(),
                    "#[keyed(partition_key)] field cannot be an Option, every record needs a partition key",
                ));
            }
            partition_field = Some((ident.clone(), false));
        }
        if field_options.sort_key {
            if sort_field.is_some() {
                return Err(syn::Error::new(
                    ident.span(),
                    "Only one field can be marked #[keyed(sort_key)]",
                ));
            }
            sort_field = Some((ident.clone(), optional));
        }

        field_idents.push(ident);
    }

    let partition_source = match (options.partition_key.clone(), partition_field) {
        (Some(template), None) => KeySource::Template(template),
        (None, Some((ident, optional))) => KeySource::Field { ident, optional },
        (Some(template), Some(_)) => {
            return Err(syn::Error::new(
                template.span(),
                "partition_key is given both as a template and as a #[keyed(partition_key)] field",
            ));
        }
        (None, None) => {
            return Err(syn::Error::new(
                struct_name.span(),
                "KeyedRecord requires #[keyed(partition_key = \"...\")] or a #[keyed(partition_key)] field",
            ));
        }
    };

    let sort_source = match (options.sort_key.clone(), sort_field) {
        (Some(template), None) => Some(KeySource::Template(template)),
        (None, Some((ident, optional))) => Some(KeySource::Field { ident, optional }),
        (None, None) => None,
        (Some(template), Some(_)) => {
            return Err(syn::Error::new(
                template.span(),
                "sort_key is given both as a template and as a #[keyed(sort_key)] field",
            ));
        }
    };

    if options.no_sort_key && (sort_source.is_some() || options.sort_key_name.is_some()) {
        return Err(syn::Error::new(
            struct_name.span(),
            "no_sort_key cannot be combined with a sort key or sort_key_name",
        ));
    }

    let partition_expr = key_expr(&partition_source, &field_idents)?;
    let sort_expr = match &sort_source {
        Some(KeySource::Field {
            ident,
            optional: true,
        }) => quote! {
            ::core::option::Option::map(
                ::core::clone::Clone::clone(&self.#ident),
                ::keyed_envelope::KeyValue::from,
            )
        },
        Some(source) => {
            let expr = key_expr(source, &field_idents)?;
            quote! { ::core::option::Option::Some(#expr) }
        }
        None => quote! { ::core::option::Option::None },
    };

    let partition_name_const = options.partition_key_name.map(|name| {
        quote! { const PARTITION_KEY_NAME: &'static str = #name; }
    });
    let sort_name_const = if options.no_sort_key {
        Some(quote! {
            const SORT_KEY_NAME: ::core::option::Option<&'static str> = ::core::option::Option::None;
        })
    } else {
        options.sort_key_name.map(|name| {
            quote! {
                const SORT_KEY_NAME: ::core::option::Option<&'static str> =
                    ::core::option::Option::Some(#name);
            }
        })
    };

    Ok(quote! {
        impl ::keyed_envelope::KeyedRecord for #struct_name {
            #partition_name_const
            #sort_name_const

            fn partition_key(&self) -> ::keyed_envelope::KeyValue {
                #partition_expr
            }

            fn sort_key(&self) -> ::core::option::Option<::keyed_envelope::KeyValue> {
                #sort_expr
            }
        }
    })
}

fn key_expr(source: &KeySource, fields: &[Ident]) -> syn::Result<TokenStream2> {
    match source {
        KeySource::Field { ident, .. } => Ok(quote! {
            ::keyed_envelope::KeyValue::from(::core::clone::Clone::clone(&self.#ident))
        }),
        KeySource::Template(template) => {
            let placeholders = template_placeholders(template)?;
            let text = template.value();
            if placeholders.is_empty() && !text.contains(['{', '}']) {
                return Ok(quote! {
                    ::keyed_envelope::KeyValue::Text(::std::string::String::from(#template))
                });
            }

            let mut args = Vec::new();
            for name in placeholders {
                let field = fields
                    .iter()
                    .find(|field| field.to_string().trim_start_matches("r#") == name)
                    .ok_or_else(|| {
                        syn::Error::new(
                            template.span(),
                            format!("Template placeholder {{{}}} does not name a field", name),
                        )
                    })?;
                if field.to_string().starts_with("r#") {
                    return Err(syn::Error::new(
                        template.span(),
                        format!(
                            "Template placeholder {{{}}} names a raw identifier field; mark the field with #[keyed(partition_key)] or #[keyed(sort_key)] instead",
                            name
                        ),
                    ));
                }
                let arg = Ident::new(&name, template.span());
                args.push(quote! { #arg = self.#field });
            }

            Ok(quote! {
                ::keyed_envelope::KeyValue::Text(::std::format!(#template, #(#args),*))
            })
        }
    }
}

/// Named placeholders of a key template, in order, without duplicates.
fn template_placeholders(template: &LitStr) -> syn::Result<Vec<String>> {
    let text = template.value();
    let mut names = Vec::<String>::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
            }
            '{' => {
                let mut inner = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    inner.push(next);
                }
                if !closed {
                    return Err(syn::Error::new(
                        template.span(),
                        "Unclosed '{' in key template",
                    ));
                }

                let name = inner.split(':').next().unwrap_or_default().trim().to_string();
                if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
                    return Err(syn::Error::new(
                        template.span(),
                        "Key template placeholders must name a field, e.g. \"USER#{id}\"",
                    ));
                }
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            _ => {}
        }
    }

    Ok(names)
}

fn parse_keyed_options(attrs: &[syn::Attribute]) -> syn::Result<KeyedOptions> {
    let mut options = KeyedOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("keyed") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("partition_key") {
                options.partition_key = Some(meta.value()?.parse()?);
                return Ok(());
            }

            if meta.path.is_ident("sort_key") {
                options.sort_key = Some(meta.value()?.parse()?);
                return Ok(());
            }

            if meta.path.is_ident("partition_key_name") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(meta.error("partition_key_name must not be empty"));
                }
                options.partition_key_name = Some(lit);
                return Ok(());
            }

            if meta.path.is_ident("sort_key_name") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(meta.error("sort_key_name must not be empty"));
                }
                options.sort_key_name = Some(lit);
                return Ok(());
            }

            if meta.path.is_ident("no_sort_key") {
                options.no_sort_key = true;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[keyed(...)] option. Supported: partition_key = \"...\", sort_key = \"...\", partition_key_name = \"...\", sort_key_name = \"...\", no_sort_key",
            ))
        })?;
    }

    Ok(options)
}

fn parse_keyed_field_options(attrs: &[syn::Attribute]) -> syn::Result<KeyedFieldOptions> {
    let mut options = KeyedFieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("keyed") {
            continue;
        }

        match &attr.meta {
            syn::Meta::List(list) => {
                list.parse_nested_meta(|meta| {
                    if meta.path.is_ident("partition_key") {
                        options.partition_key = true;
                        return Ok(());
                    }

                    if meta.path.is_ident("sort_key") {
                        options.sort_key = true;
                        return Ok(());
                    }

                    Err(meta.error(
                        "Unsupported #[keyed(...)] field option. Supported: partition_key, sort_key",
                    ))
                })?;
            }
            _ => {
                return Err(syn::Error::new(
                    attr.span(),
                    "Use #[keyed(partition_key)] or #[keyed(sort_key)] on fields",
                ));
            }
        }
    }

    Ok(options)
}
