//! Proc macros for the callbench harness.
//!
//! This crate provides the `#[bench_case]` attribute macro for defining
//! bench cases that are discovered and run by `bench_main!()`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitStr};

/// Register a function as a bench case.
///
/// The function receives the shared trial runner and returns
/// `anyhow::Result<()>`, so `?` works on both harness errors and any
/// setup error.
///
/// # Example
///
/// ```rust,ignore
/// use callbench::{bench_case, call_n, workloads, TrialRunner};
///
/// #[bench_case]
/// fn closure_call(runner: &mut TrialRunner) -> anyhow::Result<()> {
///     runner.run_trials(
///         "closure;",
///         |ctx| {
///             let n = ctx.iterations();
///             ctx.measure(workloads![|| call_n(|| 1, n)])?;
///             Ok(())
///         },
///         &[10_000, 100_000],
///     )?;
///     Ok(())
/// }
/// ```
///
/// # Attributes
///
/// - `#[bench_case]` - Basic case
/// - `#[bench_case(ignore)]` - Skip this case unless `--include-ignored` is passed
/// - `#[bench_case(name = "custom_name")]` - Use a custom name instead of the function name
#[proc_macro_attribute]
pub fn bench_case(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let fn_name = &input.sig.ident;

    let mut ignored = false;
    let mut custom_name: Option<LitStr> = None;
    let attr_parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("ignore") {
            ignored = true;
            Ok(())
        } else if meta.path.is_ident("name") {
            custom_name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported bench_case attribute; expected `ignore` or `name = \"...\"`"))
        }
    });
    parse_macro_input!(attr with attr_parser);

    let name = custom_name
        .map(|lit| lit.value())
        .unwrap_or_else(|| fn_name.to_string());

    let entry_ident = syn::Ident::new(
        &format!("__CALLBENCH_CASE_{}", fn_name.to_string().to_uppercase()),
        fn_name.span(),
    );

    let expanded = quote! {
        #input

        #[allow(non_upper_case_globals)]
        #[::callbench::__private::linkme::distributed_slice(::callbench::__private::BENCH_CASES)]
        #[linkme(crate = ::callbench::__private::linkme)]
        static #entry_ident: ::callbench::__private::CaseEntry = ::callbench::__private::CaseEntry {
            name: #name,
            func: #fn_name,
            ignored: #ignored,
            module_path: module_path!(),
        };
    };

    TokenStream::from(expanded)
}

/// Generate the `main` function of a bench binary.
///
/// Place this at the end of a `harness = false` bench target to run every
/// `#[bench_case]` it registers.
///
/// ```rust,ignore
/// callbench::bench_main!();
/// ```
#[proc_macro]
pub fn bench_main(_input: TokenStream) -> TokenStream {
    let expanded = quote! {
        fn main() -> ::std::process::ExitCode {
            ::callbench::bench_main()
        }
    };
    TokenStream::from(expanded)
}
