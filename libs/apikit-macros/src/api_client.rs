//! `#[api_client]`: declarative HTTP client registration for a trait.

use heck::ToShoutySnakeCase;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    parse::Parse, parse::ParseStream, punctuated::Punctuated, Item, ItemTrait, LitStr, Meta, Path,
    Token, Type,
};

use crate::utils::{
    parse_bool_attribute, parse_int_attribute, parse_path_list_attribute, parse_string_attribute,
    parse_type_attribute, suggest,
};

const PARAMS: &[&str] = &[
    "url",
    "proxy",
    "header",
    "request_interceptors",
    "log_level",
    "decode_404",
    "username",
    "password",
    "read_timeout",
    "retry_times",
];

const LOG_LEVELS: &[&str] = &["none", "basic", "headers", "full"];

pub struct HeaderConfig {
    key: LitStr,
    value: LitStr,
}

/// Parsed arguments of `#[api_client(...)]`.
pub struct ApiClientConfig {
    url: LitStr,
    proxy: Type,
    headers: Vec<HeaderConfig>,
    interceptors: Vec<Path>,
    log_level: Option<syn::Ident>,
    decode_404: Option<bool>,
    username: Option<LitStr>,
    password: Option<LitStr>,
    read_timeout: Option<syn::LitInt>,
    retry_times: Option<syn::LitInt>,
}

fn set_once<T>(slot: &mut Option<T>, value: T, meta: &Meta, name: &str) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new_spanned(meta, format!("duplicate `{name}` parameter")));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_header(meta: &Meta) -> syn::Result<Option<HeaderConfig>> {
    let list = match meta {
        Meta::List(list) if list.path.is_ident("header") => list,
        Meta::NameValue(nv) if nv.path.is_ident("header") => {
            return Err(syn::Error::new_spanned(
                meta,
                "`header` takes a list: header(key = \"...\", value = \"...\")",
            ));
        }
        _ => return Ok(None),
    };

    let nested = list.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
    let mut key = None;
    let mut value = None;
    for item in &nested {
        if let Some(k) = parse_string_attribute("key", item)? {
            set_once(&mut key, k, item, "key")?;
        } else if let Some(v) = parse_string_attribute("value", item)? {
            set_once(&mut value, v, item, "value")?;
        } else {
            return Err(syn::Error::new_spanned(
                item,
                "unknown header parameter; expected `key` or `value`",
            ));
        }
    }

    match (key, value) {
        (Some(key), Some(value)) => Ok(Some(HeaderConfig { key, value })),
        _ => Err(syn::Error::new_spanned(
            meta,
            "header requires both `key` and `value`",
        )),
    }
}

fn parse_log_level(lit: &LitStr) -> syn::Result<syn::Ident> {
    let raw = lit.value().trim().to_ascii_lowercase();
    let variant = match raw.as_str() {
        "none" => "None",
        "basic" => "Basic",
        "headers" => "Headers",
        "full" => "Full",
        other => {
            let hint = suggest(other, LOG_LEVELS)
                .map(|s| format!("; did you mean \"{s}\"?"))
                .unwrap_or_default();
            return Err(syn::Error::new_spanned(
                lit,
                format!(
                    "unknown log_level \"{other}\", expected one of: {}{hint}",
                    LOG_LEVELS.join(", ")
                ),
            ));
        }
    };
    Ok(syn::Ident::new(variant, lit.span()))
}

fn unknown_parameter(meta: &Meta) -> syn::Error {
    let name = meta
        .path()
        .get_ident()
        .map(ToString::to_string)
        .unwrap_or_default();
    let hint = suggest(&name, PARAMS)
        .map(|s| format!("; did you mean `{s}`?"))
        .unwrap_or_default();
    syn::Error::new_spanned(
        meta,
        format!("unknown parameter; expected one of: {}{hint}", PARAMS.join(", ")),
    )
}

impl Parse for ApiClientConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Err(syn::Error::new(
                Span::call_site(),
                "api_client: you must specify url = \"...\" and proxy = Type",
            ));
        }

        let mut url = None;
        let mut proxy = None;
        let mut headers = Vec::new();
        let mut interceptors = None;
        let mut log_level = None;
        let mut decode_404 = None;
        let mut username = None;
        let mut password = None;
        let mut read_timeout = None;
        let mut retry_times = None;

        let punctuated: Punctuated<Meta, Token![,]> =
            input.parse_terminated(Meta::parse, Token![,])?;

        for meta in &punctuated {
            if let Some(header) = parse_header(meta)? {
                headers.push(header);
            } else if let Some(v) = parse_string_attribute("url", meta)? {
                set_once(&mut url, v, meta, "url")?;
            } else if let Some(v) = parse_type_attribute("proxy", meta)? {
                set_once(&mut proxy, v, meta, "proxy")?;
            } else if let Some(v) = parse_path_list_attribute("request_interceptors", meta)? {
                set_once(&mut interceptors, v, meta, "request_interceptors")?;
            } else if let Some(v) = parse_string_attribute("log_level", meta)? {
                set_once(&mut log_level, parse_log_level(&v)?, meta, "log_level")?;
            } else if let Some(v) = parse_bool_attribute("decode_404", meta)? {
                set_once(&mut decode_404, v, meta, "decode_404")?;
            } else if let Some(v) = parse_string_attribute("username", meta)? {
                set_once(&mut username, v, meta, "username")?;
            } else if let Some(v) = parse_string_attribute("password", meta)? {
                set_once(&mut password, v, meta, "password")?;
            } else if let Some(v) = parse_int_attribute("read_timeout", meta)? {
                v.base10_parse::<u64>()?;
                set_once(&mut read_timeout, v, meta, "read_timeout")?;
            } else if let Some(v) = parse_int_attribute("retry_times", meta)? {
                v.base10_parse::<u32>()?;
                set_once(&mut retry_times, v, meta, "retry_times")?;
            } else {
                return Err(unknown_parameter(meta));
            }
        }

        let url = url.ok_or_else(|| {
            syn::Error::new(Span::call_site(), "missing required parameter: url = \"...\"")
        })?;
        let proxy = proxy.ok_or_else(|| {
            syn::Error::new(
                Span::call_site(),
                "missing required parameter: proxy = Type \
                 (implements the trait and From<HttpClient>)",
            )
        })?;

        Ok(ApiClientConfig {
            url,
            proxy,
            headers,
            interceptors: interceptors.unwrap_or_default(),
            log_level,
            decode_404,
            username,
            password,
            read_timeout,
            retry_times,
        })
    }
}

pub fn expand_api_client(config: ApiClientConfig, item: Item) -> syn::Result<TokenStream> {
    let item_trait: ItemTrait = match item {
        Item::Trait(t) => t,
        other => {
            return Err(syn::Error::new_spanned(
                other,
                "api_client can only be applied to trait declarations",
            ));
        }
    };
    if !item_trait.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item_trait.generics,
            "api_client traits must not be generic",
        ));
    }

    let trait_ident = &item_trait.ident;
    let name = LitStr::new(&trait_ident.to_string(), trait_ident.span());
    let shouty = trait_ident.to_string().to_shouty_snake_case();
    let marker_ident = format_ident!("__APIKIT_MARKER_{}", shouty);
    let target_fn = format_ident!("__apikit_target_{}", shouty.to_ascii_lowercase());
    let type_id_fn = format_ident!("__apikit_type_id_{}", shouty.to_ascii_lowercase());

    let ApiClientConfig {
        url,
        proxy,
        headers,
        interceptors,
        log_level,
        decode_404,
        username,
        password,
        read_timeout,
        retry_times,
    } = config;

    let header_exprs = headers.iter().map(|HeaderConfig { key, value }| {
        quote! { ::apikit::HeaderMarker::new(#key, #value) }
    });
    let interceptor_exprs = interceptors.iter().map(|path| {
        quote! { ::apikit::InterceptorRef::of::<#path>() }
    });

    let log_level = log_level.unwrap_or_else(|| syn::Ident::new("None", Span::call_site()));
    let decode_404 = decode_404.unwrap_or(false);
    let username = username.unwrap_or_else(|| LitStr::new("", Span::call_site()));
    let password = password.unwrap_or_else(|| LitStr::new("", Span::call_site()));
    let read_timeout = match read_timeout {
        Some(v) => quote! { #v },
        None => quote! { ::apikit::DEFAULT_READ_TIMEOUT_MS },
    };
    let retry_times = match retry_times {
        Some(v) => quote! { #v },
        None => quote! { ::apikit::DEFAULT_RETRY_TIMES },
    };

    let expanded = quote! {
        #item_trait

        const _: () = {
            // `dyn Trait` must be shareable across threads to live in the container
            fn __assert_shareable<T>()
            where
                T: ?::core::marker::Sized + ::core::marker::Send + ::core::marker::Sync + 'static,
            {
            }
            const _: fn() = || __assert_shareable::<dyn #trait_ident>();

            fn #type_id_fn() -> ::core::any::TypeId {
                ::core::any::TypeId::of::<dyn #trait_ident>()
            }

            fn #target_fn(client: ::apikit::HttpClient) -> ::apikit::BoxedClient {
                let api: ::std::sync::Arc<dyn #trait_ident> = ::std::sync::Arc::new(
                    <#proxy as ::core::convert::From<::apikit::HttpClient>>::from(client),
                );
                ::std::boxed::Box::new(api)
            }

            static #marker_ident: ::apikit::ApiMarker = ::apikit::ApiMarker {
                url: #url,
                headers: &[#(#header_exprs),*],
                request_interceptors: &[#(#interceptor_exprs),*],
                log_level: ::apikit::LogLevel::#log_level,
                decode_404: #decode_404,
                username: #username,
                password: #password,
                read_timeout_ms: #read_timeout,
                retry_times: #retry_times,
            };

            ::apikit::inventory::submit! {
                ::apikit::ApiDeclaration {
                    name: #name,
                    module_path: ::core::module_path!(),
                    kind: ::apikit::DeclarationKind::Interface,
                    independent: true,
                    marker: ::core::option::Option::Some(&#marker_ident),
                    interface: ::apikit::ApiInterface::new(#name, #type_id_fn, #target_fn),
                }
            }
        };
    };

    Ok(expanded)
}
