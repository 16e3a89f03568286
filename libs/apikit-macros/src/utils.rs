use syn::{Expr, ExprLit, Lit, Meta, Path, Type};

/// Closest candidate to `input`, if it is a plausible typo.
pub fn suggest<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, strsim::levenshtein(input, c)))
        .filter(|(_, distance)| *distance <= 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(c, _)| c)
}

/// `name = "literal"`
pub fn parse_string_attribute(attr_name: &str, meta: &Meta) -> syn::Result<Option<syn::LitStr>> {
    match meta {
        Meta::NameValue(nv) if nv.path.is_ident(attr_name) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(lit_str),
                ..
            }) => Ok(Some(lit_str.clone())),
            other => Err(syn::Error::new_spanned(
                other,
                format!("`{attr_name}` must be a string literal"),
            )),
        },
        _ => Ok(None),
    }
}

/// `name = true|false`
pub fn parse_bool_attribute(attr_name: &str, meta: &Meta) -> syn::Result<Option<bool>> {
    match meta {
        Meta::NameValue(nv) if nv.path.is_ident(attr_name) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Bool(b), ..
            }) => Ok(Some(b.value)),
            other => Err(syn::Error::new_spanned(
                other,
                format!("`{attr_name}` must be `true` or `false`"),
            )),
        },
        _ => Ok(None),
    }
}

/// `name = 123`
pub fn parse_int_attribute(attr_name: &str, meta: &Meta) -> syn::Result<Option<syn::LitInt>> {
    match meta {
        Meta::NameValue(nv) if nv.path.is_ident(attr_name) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Int(i), ..
            }) => Ok(Some(i.clone())),
            other => Err(syn::Error::new_spanned(
                other,
                format!("`{attr_name}` must be an integer literal"),
            )),
        },
        _ => Ok(None),
    }
}

/// `name = path::to::Type`
pub fn parse_type_attribute(attr_name: &str, meta: &Meta) -> syn::Result<Option<Type>> {
    match meta {
        Meta::NameValue(nv) if nv.path.is_ident(attr_name) => match &nv.value {
            Expr::Path(p) if p.qself.is_none() => Ok(Some(Type::Path(syn::TypePath {
                qself: None,
                path: p.path.clone(),
            }))),
            Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) => s.parse::<Type>().map(Some),
            other => Err(syn::Error::new_spanned(
                other,
                format!("`{attr_name}` must be a type path"),
            )),
        },
        _ => Ok(None),
    }
}

/// `name = [path::A, path::B]`
pub fn parse_path_list_attribute(attr_name: &str, meta: &Meta) -> syn::Result<Option<Vec<Path>>> {
    match meta {
        Meta::NameValue(nv) if nv.path.is_ident(attr_name) => match &nv.value {
            Expr::Array(array) => array
                .elems
                .iter()
                .map(|elem| match elem {
                    Expr::Path(p) if p.qself.is_none() => Ok(p.path.clone()),
                    other => Err(syn::Error::new_spanned(
                        other,
                        format!("`{attr_name}` entries must be type paths"),
                    )),
                })
                .collect::<syn::Result<Vec<_>>>()
                .map(Some),
            other => Err(syn::Error::new_spanned(
                other,
                format!("`{attr_name}` must be a list of types, e.g. `[TraceInterceptor]`"),
            )),
        },
        _ => Ok(None),
    }
}
